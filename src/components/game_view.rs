use std::cell::RefCell;
use std::rc::Rc;

use stroop_runner::audio::AudioEngine;
use stroop_runner::audio::web::WebAudioBackend;
use stroop_runner::effects;
use stroop_runner::model::{Flash, ObstacleItem, ObstacleRow, PowerUp, RowKind, TextTone};
use stroop_runner::util::clog;
use stroop_runner::{FrameSnapshot, GameConfig, GameEvent, PracticeMode, Session, Settings};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::KeyboardEvent;
use yew::prelude::*;

use super::AudioHandle;
use super::hud::Hud;
use super::settings_modal::SettingsModal;

#[derive(Properties, PartialEq, Clone)]
pub struct GameViewProps {
    pub practice: PracticeMode,
    pub settings: Settings,
    pub audio: AudioHandle,
    pub on_game_over: Callback<(u32, f64)>,
    pub on_quit: Callback<()>,
    pub on_settings_change: Callback<Settings>,
}

fn vibrate(millis: u32) {
    if let Some(win) = web_sys::window() {
        win.navigator().vibrate_with_duration(millis);
    }
}

/// Hands frame events to the audio engine and the browser. Returns the
/// final result if the run ended.
fn route_events(events: Vec<GameEvent>, audio: &mut AudioEngine<WebAudioBackend>) -> Option<(u32, f64)> {
    let mut result = None;
    for event in events {
        match event {
            GameEvent::Audio(command) => audio.handle(command),
            GameEvent::Haptic { millis } => vibrate(millis),
            GameEvent::ScoreChanged { score } => clog(&format!("score: {score}")),
            GameEvent::GameOver { score, elapsed_ms } => result = Some((score, elapsed_ms)),
        }
    }
    audio.pump();
    result
}

fn tone_color(tone: TextTone) -> &'static str {
    match tone {
        TextTone::Plain => "#ffffff",
        TextTone::Bonus => "#fde68a",
        TextTone::Effect(PowerUp::Drunk) => "#c084fc",
        TextTone::Effect(PowerUp::Fog) => "#cbd5e1",
        TextTone::Effect(PowerUp::Dyslexia) => "#fb923c",
        TextTone::Effect(PowerUp::Gps) => "#2dd4bf",
        TextTone::Effect(PowerUp::Blocker) => "#f59e0b",
        TextTone::Effect(PowerUp::Glitch) => "#a3e635",
        TextTone::Effect(PowerUp::Bleach) => "#ef4444",
        TextTone::Effect(PowerUp::Alias) => "#818cf8",
        TextTone::Effect(_) => "#facc15",
        TextTone::Warp => "#e879f9",
        TextTone::Surge => "#22d3ee",
    }
}

fn render_item(row: &ObstacleRow, lane: usize, item: &ObstacleItem, snap: &FrameSnapshot, visual_fx: bool) -> Html {
    let effect = snap.active_effect;
    if row.kind == RowKind::Crate {
        let label = item.effect.map(|p| effects::info(p).label).unwrap_or("");
        return html! {
            <div style="border:2px dashed #6b7280; border-radius:8px; padding:6px; text-align:center; font-weight:700; color:#e5e7eb;">
                { format!("[{label}]") }
            </div>
        };
    }
    if effect.is_active(PowerUp::Blocker) && effects::is_blocked(row.id, lane, row.lane_count()) {
        return html! { <div style="background:#44403c; border-radius:8px; padding:6px; text-align:center;">{"■■■"}</div> };
    }
    let word = if effect.is_active(PowerUp::Glitch) {
        effects::glitch_text(item.word.name(), effects::glitch_seed(row.id, lane))
    } else {
        item.word.name().to_owned()
    };
    let color = if effect.is_active(PowerUp::Bleach) { "#9ca3af" } else { item.display_color.hex() };
    let blur = if visual_fx && effect.is_active(PowerUp::Fog) { " filter:blur(2px);" } else { "" };
    let hit = if item.is_hit { " outline:2px solid #22c55e;" } else { "" };
    html! {
        <div style={format!("background:#111827; border-radius:8px; padding:6px; text-align:center; font-weight:800; color:{color};{blur}{hit}")}>
            { word }
        </div>
    }
}

fn render_row(row: &ObstacleRow, snap: &FrameSnapshot, visual_fx: bool) -> Html {
    let lanes = row.lane_count().max(1);
    let guided = row.is_guided.then_some("box-shadow:0 0 12px #38bdf8;").unwrap_or("");
    html! {
        <div key={row.id} style={format!("position:absolute; left:0; right:0; top:{}%; display:grid; grid-template-columns:repeat({lanes}, 1fr); gap:8px; padding:0 8px; {guided}", row.y)}>
            { for row.items.iter().enumerate().map(|(lane, slot)| match slot {
                Some(item) => render_item(row, lane, item, snap, visual_fx),
                None => html! { <div /> },
            }) }
        </div>
    }
}

#[function_component]
pub fn GameView(props: &GameViewProps) -> Html {
    let practice = props.practice;
    let session = use_mut_ref(|| Session::new(GameConfig::default(), practice));
    let snapshot = use_state(|| session.borrow().snapshot());
    let settings_ref = use_mut_ref(|| props.settings.clone());
    let result = use_state(|| None::<(u32, f64)>);
    *settings_ref.borrow_mut() = props.settings.clone();

    // Report the result outside the frame callback
    {
        let on_game_over = props.on_game_over.clone();
        use_effect_with(*result, move |r| {
            if let Some(r) = r {
                on_game_over.emit(*r);
            }
            || ()
        });
    }

    {
        let session = session.clone();
        let snapshot = snapshot.clone();
        let settings_ref = settings_ref.clone();
        let result = result.clone();
        let audio = props.audio.0.clone();
        use_effect_with((), move |_| {
            let window = web_sys::window();
            let raf_id = Rc::new(RefCell::new(None::<i32>));
            let last_ts = Rc::new(RefCell::new(None::<f64>));
            let closure_cell: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));

            {
                let closure_cell_loop = closure_cell.clone();
                let raf_id = raf_id.clone();
                let session = session.clone();
                let audio = audio.clone();
                *closure_cell.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
                    let dt = match last_ts.replace(Some(ts)) {
                        Some(prev) => ts - prev,
                        None => 0.0,
                    };
                    let events = session.borrow_mut().step(dt, &settings_ref.borrow());
                    if let Some(r) = route_events(events, &mut audio.borrow_mut()) {
                        result.set(Some(r));
                    }
                    let s = session.borrow();
                    snapshot.set(s.snapshot());
                    if s.is_over() {
                        return;
                    }
                    let (Some(win), Some(cb)) = (web_sys::window(), closure_cell_loop.borrow().as_ref().map(|c| c.as_ref().clone())) else {
                        return;
                    };
                    if let Ok(id) = win.request_animation_frame(cb.unchecked_ref()) {
                        *raf_id.borrow_mut() = Some(id);
                    }
                }) as Box<dyn FnMut(f64)>));
            }
            if let (Some(win), Some(cb)) = (window.as_ref(), closure_cell.borrow().as_ref()) {
                if let Ok(id) = win.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    *raf_id.borrow_mut() = Some(id);
                }
            }

            let key_cb = {
                let session = session.clone();
                Closure::wrap(Box::new(move |e: KeyboardEvent| {
                    let mut s = session.borrow_mut();
                    match e.key().as_str() {
                        "Escape" => s.toggle_pause(),
                        "ArrowLeft" | "a" | "A" => s.shift_lane(-1),
                        "ArrowRight" | "d" | "D" => s.shift_lane(1),
                        k => {
                            if let Some(n) = k.parse::<usize>().ok().filter(|n| (1..=4).contains(n)) {
                                s.select_lane(n - 1);
                            }
                            return;
                        }
                    }
                    e.prevent_default();
                }) as Box<dyn FnMut(_)>)
            };
            let visibility_cb = {
                let audio = audio.clone();
                Closure::wrap(Box::new(move |_: web_sys::Event| {
                    let hidden = web_sys::window()
                        .and_then(|w| w.document())
                        .is_some_and(|d| d.hidden());
                    audio.borrow_mut().set_system_suspended(hidden);
                }) as Box<dyn FnMut(_)>)
            };
            if let Some(win) = window.as_ref() {
                let _ = win.add_event_listener_with_callback("keydown", key_cb.as_ref().unchecked_ref());
                if let Some(doc) = win.document() {
                    let _ = doc.add_event_listener_with_callback("visibilitychange", visibility_cb.as_ref().unchecked_ref());
                }
            }

            move || {
                if let Some(win) = window.as_ref() {
                    if let Some(id) = raf_id.borrow_mut().take() {
                        let _ = win.cancel_animation_frame(id);
                    }
                    let _ = win.remove_event_listener_with_callback("keydown", key_cb.as_ref().unchecked_ref());
                    if let Some(doc) = win.document() {
                        let _ = doc.remove_event_listener_with_callback("visibilitychange", visibility_cb.as_ref().unchecked_ref());
                    }
                }
                closure_cell.borrow_mut().take();
                drop(key_cb);
                drop(visibility_cb);
            }
        });
    }

    let snap = (*snapshot).clone();
    let visual_fx = props.settings.visual_fx;

    let lane_click = |lane: usize| {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| session.borrow_mut().select_lane(lane))
    };
    let toggle_pause = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| session.borrow_mut().toggle_pause())
    };
    let open_settings = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| session.borrow_mut().set_settings_open(true))
    };
    let close_settings = {
        let session = session.clone();
        Callback::from(move |_: ()| session.borrow_mut().set_settings_open(false))
    };
    let dismiss_tutorial = {
        let session = session.clone();
        Callback::from(move |_: MouseEvent| session.borrow_mut().dismiss_tutorial())
    };
    let quit = {
        let cb = props.on_quit.clone();
        Callback::from(move |_: MouseEvent| cb.emit(()))
    };

    let flash_bg = match snap.flash {
        Some(Flash::Success) => "rgba(34,197,94,0.18)",
        Some(Flash::Saved) => "rgba(255,255,255,0.25)",
        Some(Flash::Crash) => "rgba(239,68,68,0.45)",
        None => "transparent",
    };
    let sway = if visual_fx && snap.active_effect.is_active(PowerUp::Drunk) { "transform:rotate(2deg);" } else { "" };
    let lanes = snap.lane_count.max(1);
    let lane_width = 100.0 / lanes as f64;
    let player_y = session.borrow().config().player_y;

    html! {
        <div style={format!("position:absolute; inset:0; {sway}")}>
            <Hud snapshot={snap.clone()} />
            <div style="position:absolute; top:80px; left:0; right:0; bottom:0;">
                { for (0..lanes).map(|lane| {
                    let gps = snap.gps_lane == Some(lane);
                    let bg = if gps { "rgba(45,212,191,0.12)" } else { "transparent" };
                    html! {
                        <div onclick={lane_click(lane)} style={format!("position:absolute; top:0; bottom:0; left:{}%; width:{}%; border-left:1px solid #21262d; background:{bg};", lane as f64 * lane_width, lane_width)} />
                    }
                }) }
                { for snap.rows.iter().map(|row| render_row(row, &snap, visual_fx)) }
                <div style={format!("position:absolute; top:{player_y}%; left:{}%; width:{}%; height:24px; display:flex; justify-content:center; pointer-events:none;", snap.player_lane as f64 * lane_width, lane_width)}>
                    <div style="width:32px; height:24px; background:#58a6ff; border-radius:6px;" />
                </div>
                { for snap.floating_texts.iter().map(|t| html! {
                    <div key={t.id} style={format!("position:absolute; top:{}%; left:{}%; width:{}%; text-align:center; font-weight:800; color:{}; pointer-events:none;", t.y, t.lane as f64 * lane_width, lane_width, tone_color(t.tone))}>
                        { t.text.clone() }
                    </div>
                }) }
                if let (true, Some(lane)) = (snap.show_tap_guidance, snap.guidance_lane) {
                    <div style={format!("position:absolute; bottom:4%; left:{}%; width:{}%; text-align:center; color:#38bdf8; pointer-events:none;", lane as f64 * lane_width, lane_width)}>{"TAP HERE"}</div>
                }
            </div>
            <div style={format!("position:absolute; inset:0; pointer-events:none; background:{flash_bg};")} />
            <div style="position:absolute; top:50%; left:0; right:0; text-align:center; font-size:32px; font-weight:900; pointer-events:none;">
                if let Some(level) = snap.level_announcement { <div>{ format!("LEVEL {level}") }</div> }
                if let Some(count) = snap.lane_warning { <div style="color:#f59e0b;">{ format!("WARNING: NEW LANE IN {count}") }</div> }
                if let Some(text) = snap.countdown.clone() { <div>{ text }</div> }
                if snap.life_banner { <div style="color:#f85149;">{"+1 LIFE"}</div> }
                if snap.warp_banner { <div style="color:#e879f9;">{"REVERSE!"}</div> }
                if let Some(msg) = snap.intro_message.clone() { <div style="font-size:18px;">{ msg }</div> }
            </div>
            <div style="position:absolute; bottom:12px; right:12px; display:flex; gap:8px; z-index:20;">
                <button onclick={toggle_pause.clone()}>{ if snap.paused { "Resume" } else { "Pause" } }</button>
            </div>
            if snap.paused {
                <div style="position:absolute; inset:0; display:flex; flex-direction:column; align-items:center; justify-content:center; gap:12px; background:rgba(0,0,0,0.6);">
                    <h2 style="margin:0;">{"Paused"}</h2>
                    <button onclick={toggle_pause}>{"Resume"}</button>
                    <button onclick={open_settings}>{"Settings"}</button>
                    <button onclick={quit}>{"Quit"}</button>
                </div>
            }
            if let Some(p) = snap.tutorial {
                <div style="position:absolute; inset:0; display:flex; align-items:center; justify-content:center; background:rgba(0,0,0,0.7);">
                    <div style="background:#161b22; border:1px solid #30363d; border-radius:12px; padding:16px 20px; max-width:360px;">
                        <h3 style="margin:0 0 8px 0;">{ effects::info(p).label }</h3>
                        <p style="margin:0 0 8px 0; opacity:0.8;">{ effects::info(p).description }</p>
                        <ul>{ for effects::info(p).tutorial.iter().map(|line| html! { <li>{ *line }</li> }) }</ul>
                        <button onclick={dismiss_tutorial}>{"Got it"}</button>
                    </div>
                </div>
            }
            <SettingsModal
                show={snap.settings_open}
                settings={props.settings.clone()}
                on_change={props.on_settings_change.clone()}
                on_close={close_settings}
            />
        </div>
    }
}

