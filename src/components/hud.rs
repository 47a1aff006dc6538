use stroop_runner::FrameSnapshot;
use stroop_runner::effects::{self, ActiveEffect};
use stroop_runner::model::{PowerUp, RuleKind};
use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct HudProps {
    pub snapshot: FrameSnapshot,
}

/// Color of the objective word. Word rules print it neutral; aliases hide it.
fn word_color(snap: &FrameSnapshot) -> &'static str {
    if snap.active_effect.is_active(PowerUp::Alias) {
        return "#e6edf3";
    }
    match snap.hud_rule.kind {
        RuleKind::MatchWord => "#e6edf3",
        RuleKind::MatchColor => snap.hud_rule.target.hex(),
    }
}

fn effect_label(effect: ActiveEffect) -> Option<String> {
    match effect {
        ActiveEffect::None => None,
        ActiveEffect::Single(p) => Some(effects::info(p).label.to_owned()),
        ActiveEffect::Wild(a, b) => Some(format!("WILD: {} + {}", effects::info(a).label, effects::info(b).label)),
    }
}

#[function_component]
pub fn Hud(props: &HudProps) -> Html {
    let snap = &props.snapshot;
    let row_style = "display:flex; align-items:center; gap:8px;";
    let value_style = "min-width:40px; text-align:right; font-variant-numeric:tabular-nums; font-weight:600;";
    let kind = match snap.hud_rule.kind {
        RuleKind::MatchColor => "MATCH COLOR",
        RuleKind::MatchWord => "MATCH WORD",
    };
    let scale = if snap.pulse { "transform:scale(1.15);" } else { "" };
    let reverse = if snap.is_reversed() { " (REVERSE)" } else { "" };
    html! {
        <div style="position:absolute; top:0; left:0; right:0; height:72px; display:flex; align-items:center; justify-content:space-between; padding:0 14px; background:rgba(22,27,34,0.9); border-bottom:1px solid #30363d; font-size:14px; z-index:10;">
            <div style="display:flex; flex-direction:column; gap:4px;">
                <div style={row_style}>
                    <span style="color:#d4af37;">{"Score"}</span>
                    <span style={format!("{value_style} color:#d4af37;")}>{ snap.score }</span>
                </div>
                <div style={row_style}>
                    <span style="color:#f85149;">{"Lives"}</span>
                    <span style={format!("{value_style} color:#f85149;")}>{ snap.lives }</span>
                </div>
            </div>
            <div style={format!("display:flex; flex-direction:column; align-items:center; transition:transform 0.15s; {scale}")}>
                <span style="font-size:11px; opacity:0.7; letter-spacing:2px;">{ format!("{kind}{reverse}") }</span>
                <span style={format!("font-size:24px; font-weight:900; color:{};", word_color(snap))}>{ snap.hud_word() }</span>
                <span style="font-size:11px; opacity:0.7;">{ format!("{}/{}", snap.progress, snap.total) }</span>
            </div>
            <div style="display:flex; flex-direction:column; align-items:flex-end; gap:4px;">
                <span style="color:#58a6ff;">{ format!("Level {}", snap.level) }</span>
                if let Some(label) = effect_label(snap.active_effect) {
                    <span style="color:#facc15; font-weight:700;">{ label }</span>
                }
            </div>
        </div>
    }
}
