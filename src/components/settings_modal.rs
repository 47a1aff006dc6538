use stroop_runner::Settings;
use stroop_runner::config::VolumeChannel;
use stroop_runner::effects;
use stroop_runner::model::PowerUp;
use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct SettingsModalProps {
    pub show: bool,
    pub settings: Settings,
    pub on_change: Callback<Settings>,
    pub on_close: Callback<()>,
}

#[function_component]
pub fn SettingsModal(props: &SettingsModalProps) -> Html {
    let error = use_state(|| None::<String>);
    if !props.show {
        return html! {};
    }

    let close_cb = {
        let cb = props.on_close.clone();
        let error = error.clone();
        Callback::from(move |_| {
            error.set(None);
            cb.emit(())
        })
    };

    let slider = |label: &'static str, channel: VolumeChannel, value: f32| {
        let settings = props.settings.clone();
        let on_change = props.on_change.clone();
        let oninput = Callback::from(move |e: InputEvent| {
            let Some(input) = e.target_dyn_into::<web_sys::HtmlInputElement>() else { return };
            let Ok(v) = input.value().parse::<f32>() else { return };
            let mut next = settings.clone();
            if next.set_volume(channel, v / 100.0).is_ok() {
                on_change.emit(next);
            }
        });
        html! {
            <label style="display:flex; align-items:center; gap:8px;">
                <span style="flex:1;">{ label }</span>
                <input type="range" min="0" max="100" value={((value * 100.0).round() as i32).to_string()} {oninput} />
                <span style="min-width:36px; text-align:right; font-variant-numeric:tabular-nums;">{ format!("{}%", (value * 100.0).round()) }</span>
            </label>
        }
    };

    let toggle_visual = {
        let settings = props.settings.clone();
        let cb = props.on_change.clone();
        Callback::from(move |_| cb.emit(Settings { visual_fx: !settings.visual_fx, ..settings.clone() }))
    };
    let toggle_haptics = {
        let settings = props.settings.clone();
        let cb = props.on_change.clone();
        Callback::from(move |_| cb.emit(Settings { haptics: !settings.haptics, ..settings.clone() }))
    };

    let power_up_toggle = |p: PowerUp| {
        let settings = props.settings.clone();
        let cb = props.on_change.clone();
        let error = error.clone();
        let onclick = Callback::from(move |_| {
            let mut next = settings.clone();
            match next.toggle_power_up(p) {
                Ok(_) => {
                    error.set(None);
                    cb.emit(next);
                }
                Err(e) => error.set(Some(e.to_string())),
            }
        });
        html! {
            <label style="display:flex; align-items:center; gap:6px; cursor:pointer;">
                <input type="checkbox" checked={props.settings.is_enabled(p)} {onclick} />
                <span>{ effects::info(p).label }</span>
            </label>
        }
    };

    html! {<div style="position:absolute; inset:0; display:flex; align-items:center; justify-content:center; background:rgba(0,0,0,0.55); z-index:50;">
        <div style="background:#161b22; border:1px solid #30363d; border-radius:12px; padding:16px 20px; min-width:340px; max-width:480px; display:flex; flex-direction:column; gap:14px;">
            <div style="display:flex; justify-content:space-between; align-items:center;">
                <h3 style="margin:0; font-size:18px;">{"Settings"}</h3>
                <button onclick={close_cb.clone()} style="padding:4px 8px;">{"Close"}</button>
            </div>
            <div style="display:flex; flex-direction:column; gap:10px;">
                { slider("Master", VolumeChannel::Master, props.settings.master_volume) }
                { slider("Music", VolumeChannel::Music, props.settings.music_volume) }
                { slider("Effects", VolumeChannel::Effects, props.settings.sfx_volume) }
            </div>
            <div style="display:flex; flex-direction:column; gap:10px;">
                <label style="display:flex; align-items:center; gap:8px; cursor:pointer;">
                    <input type="checkbox" checked={props.settings.visual_fx} onclick={toggle_visual} />
                    <span>{"Visual Effects"}</span>
                </label>
                <label style="display:flex; align-items:center; gap:8px; cursor:pointer;">
                    <input type="checkbox" checked={props.settings.haptics} onclick={toggle_haptics} />
                    <span>{"Haptics"}</span>
                </label>
            </div>
            <div>
                <div style="font-weight:600; margin-bottom:6px;">{"Power-ups"}</div>
                <div style="display:grid; grid-template-columns:repeat(3, 1fr); gap:6px;">
                    { for PowerUp::ALL.into_iter().map(power_up_toggle) }
                </div>
                if let Some(msg) = (*error).clone() {
                    <div style="margin-top:6px; font-size:12px; color:#f85149;">{ msg }</div>
                }
            </div>
            <button onclick={close_cb}>{"Done"}</button>
        </div>
    </div>}
}
