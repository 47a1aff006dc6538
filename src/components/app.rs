use std::cell::RefCell;
use std::rc::Rc;

use log::warn;
use stroop_runner::audio::AudioEngine;
use stroop_runner::audio::web::WebAudioBackend;
use stroop_runner::effects;
use stroop_runner::model::PowerUp;
use stroop_runner::util::{clog, format_time};
use stroop_runner::{PracticeMode, Settings};
use yew::prelude::*;

use super::AudioHandle;
use super::game_over_overlay::GameOverOverlay;
use super::game_view::GameView;
use super::settings_modal::SettingsModal;

const SETTINGS_KEY: &str = "stroop_runner.settings";

#[derive(PartialEq, Clone)]
enum Screen {
    Menu,
    Playing,
    GameOver { score: u32, elapsed_ms: f64 },
}

fn load_settings() -> Settings {
    let raw = web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .and_then(|store| store.get_item(SETTINGS_KEY).ok().flatten());
    match raw.map(|r| Settings::from_json(&r)) {
        Some(Ok(s)) => s,
        Some(Err(e)) => {
            warn!("ignoring stored settings: {e}");
            Settings::default()
        }
        None => Settings::default(),
    }
}

fn store_settings(settings: &Settings) {
    let Some(store) = web_sys::window().and_then(|w| w.local_storage().ok().flatten()) else {
        return;
    };
    match settings.to_json() {
        Ok(s) => {
            let _ = store.set_item(SETTINGS_KEY, &s);
        }
        Err(e) => warn!("settings not saved: {e}"),
    }
}

fn practice_options() -> Vec<(String, PracticeMode)> {
    let mut options = vec![
        ("Standard run".to_owned(), PracticeMode::Off),
        ("Practice: 4 lanes".to_owned(), PracticeMode::FourLanes),
        ("Practice: color only".to_owned(), PracticeMode::ColorOnly),
        ("Practice: word only".to_owned(), PracticeMode::WordOnly),
    ];
    for p in PowerUp::ALL {
        options.push((format!("Practice: {} crate", effects::info(p).label), PracticeMode::SingleCrate(p)));
    }
    options
}

#[function_component(App)]
pub fn app() -> Html {
    let screen = use_state(|| Screen::Menu);
    let settings = use_state(load_settings);
    let practice = use_state(|| PracticeMode::Off);
    let run_id = use_state(|| 0u32);
    let high_score = use_state(|| 0u32);
    let show_settings = use_state(|| false);
    let audio = use_mut_ref(|| AudioEngine::<WebAudioBackend>::new());

    // Persist settings changes & apply to audio
    {
        let audio = audio.clone();
        use_effect_with((*settings).clone(), move |s| {
            store_settings(s);
            audio.borrow_mut().apply_settings(s);
            || ()
        });
    }

    let on_settings_change = {
        let settings = settings.clone();
        Callback::from(move |s: Settings| settings.set(s))
    };

    let start = {
        let screen = screen.clone();
        let run_id = run_id.clone();
        let audio = audio.clone();
        let settings = settings.clone();
        Callback::from(move |_: ()| {
            attach_audio(&audio, &settings);
            run_id.set(*run_id + 1);
            screen.set(Screen::Playing);
        })
    };

    let on_game_over = {
        let screen = screen.clone();
        let high_score = high_score.clone();
        let practice = practice.clone();
        Callback::from(move |(score, elapsed_ms): (u32, f64)| {
            if !practice.is_practice() && score > *high_score {
                clog(&format!("high score: {} -> {}", *high_score, score));
                high_score.set(score);
            }
            screen.set(Screen::GameOver { score, elapsed_ms });
        })
    };

    let to_menu = {
        let screen = screen.clone();
        let audio = audio.clone();
        Callback::from(move |_: ()| {
            let mut engine = audio.borrow_mut();
            engine.stop_music();
            engine.set_logic_suspended(true);
            screen.set(Screen::Menu);
        })
    };

    let on_practice_change = {
        let practice = practice.clone();
        Callback::from(move |e: Event| {
            let Some(select) = e.target_dyn_into::<web_sys::HtmlSelectElement>() else { return };
            if let Ok(i) = select.value().parse::<usize>() {
                if let Some((_, mode)) = practice_options().get(i) {
                    practice.set(*mode);
                }
            }
        })
    };

    let content = match (*screen).clone() {
        Screen::Menu => {
            let open_settings = {
                let show_settings = show_settings.clone();
                Callback::from(move |_| show_settings.set(true))
            };
            let close_settings = {
                let show_settings = show_settings.clone();
                Callback::from(move |_| show_settings.set(false))
            };
            html! {
                <div style="position:absolute; inset:0; display:flex; flex-direction:column; align-items:center; justify-content:center; gap:16px;">
                    <h1 style="margin:0; letter-spacing:4px;">{"STROOP RUNNER"}</h1>
                    <p style="margin:0; opacity:0.7;">{ format!("High score: {}", *high_score) }</p>
                    <select onchange={on_practice_change}>
                        { for practice_options().into_iter().enumerate().map(|(i, (label, mode))| html! {
                            <option value={i.to_string()} selected={mode == *practice}>{ label }</option>
                        }) }
                    </select>
                    <div style="display:flex; gap:12px;">
                        <button onclick={start.reform(|_| ())}>{"Start"}</button>
                        <button onclick={open_settings}>{"Settings"}</button>
                    </div>
                    <SettingsModal
                        show={*show_settings}
                        settings={(*settings).clone()}
                        on_change={on_settings_change.clone()}
                        on_close={close_settings}
                    />
                </div>
            }
        }
        Screen::Playing => html! {
            <GameView
                key={*run_id}
                practice={*practice}
                settings={(*settings).clone()}
                audio={AudioHandle(audio.clone())}
                on_game_over={on_game_over}
                on_quit={to_menu.clone()}
                on_settings_change={on_settings_change}
            />
        },
        Screen::GameOver { score, elapsed_ms } => html! {
            <GameOverOverlay
                score={score}
                high_score={*high_score}
                time_survived={format_time(elapsed_ms)}
                practice={practice.is_practice()}
                restart={start.clone()}
                to_menu={to_menu.clone()}
            />
        },
    };

    html! { <div id="root" style="position:relative; width:100vw; height:100vh; overflow:hidden; background:#0d1117; color:#e6edf3; font-family:sans-serif;">{ content }</div> }
}

/// The audio context may only be created after a user gesture, so it is
/// attached on the first start.
fn attach_audio(audio: &Rc<RefCell<AudioEngine<WebAudioBackend>>>, settings: &Settings) {
    let mut engine = audio.borrow_mut();
    if !engine.is_attached() {
        match WebAudioBackend::new() {
            Ok(backend) => engine.attach(backend),
            Err(e) => warn!("audio unavailable, playing silently: {e}"),
        }
    }
    engine.apply_settings(settings);
    engine.set_logic_suspended(false);
}
