pub mod app;
pub mod game_over_overlay;
pub mod game_view;
pub mod hud;
pub mod settings_modal;

use std::cell::RefCell;
use std::rc::Rc;

use stroop_runner::audio::AudioEngine;
use stroop_runner::audio::web::WebAudioBackend;

/// Audio engine shared by every run; compared by identity in props.
#[derive(Clone)]
pub struct AudioHandle(pub Rc<RefCell<AudioEngine<WebAudioBackend>>>);

impl PartialEq for AudioHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
