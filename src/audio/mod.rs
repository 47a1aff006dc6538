//! Procedural audio: cue recipes, the background loop and the transport that
//! drives a playback backend from game events.

pub mod cues;
pub mod music;
pub mod patch;
pub mod synth;
pub mod web;

use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Settings;
use patch::Patch;
use synth::StereoBuffer;

pub const DUCKED_MULTIPLIER: f32 = 0.3;
pub const DUCK_RAMP_SECS: f32 = 0.2;
pub const MUSIC_VOLUME_RAMP_SECS: f32 = 0.05;
pub const STOP_FADE_SECS: f32 = 0.5;
pub const STOP_FLOOR: f32 = 0.001;
pub const THEME_RAMP_SECS: f32 = 0.1;
pub const WORD_DETUNE_CENTS: f32 = 200.0;
pub const COLOR_DETUNE_CENTS: f32 = 100.0;
pub const WARP_RATE: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cue {
    Crash,
    LevelUp,
    Objective,
    Crate,
    LifeLost,
    LifeGained,
    Wild,
    Spin,
    WarpRewind { set_index: u32 },
}

/// What the game asks of the audio engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum AudioCommand {
    Play(Cue),
    StartMusic { restart: bool },
    StopMusic,
    SetReverse(bool),
    SetWordTheme(bool),
    SetWarpTransition(bool),
    RampToWarpSpeed { seconds: f32 },
    SetDucked(bool),
    SuspendLogic(bool),
    Reset,
}

#[derive(Debug, Error, PartialEq)]
pub enum AudioError {
    #[error("audio backend error: {0}")]
    Backend(String),
    #[error("music buffers not uploaded")]
    MusicNotReady,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Param {
    MasterGain,
    MusicGain,
    EffectsGain,
    MusicDetune,
    MusicRate,
}

/// Parameter change starting now, anchored at the parameter's current value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Ramp {
    Set(f32),
    Linear { to: f32, secs: f32 },
    Exponential { to: f32, secs: f32 },
}

/// Playback graph: master bus to the output, a music voice and an effects
/// bus both feeding the master.
pub trait AudioBackend {
    /// Audio clock, seconds.
    fn now(&self) -> f64;
    fn sample_rate(&self) -> f32;
    fn upload_music(&mut self, forward: &StereoBuffer, reverse: &StereoBuffer) -> Result<(), AudioError>;
    /// Starts a looping voice at rate 1 on the given buffer.
    fn start_music_voice(&mut self, reverse: bool) -> Result<(), AudioError>;
    /// Stops and disconnects the music voice.
    fn stop_music_voice(&mut self) -> Result<(), AudioError>;
    /// Ends the music voice at audio time `at` with no further calls.
    fn schedule_music_stop(&mut self, at: f64) -> Result<(), AudioError>;
    fn automate(&mut self, param: Param, ramp: Ramp) -> Result<(), AudioError>;
    fn play_patch(&mut self, patch: &Patch) -> Result<(), AudioError>;
    fn set_suspended(&mut self, suspended: bool) -> Result<(), AudioError>;
}

fn log_failure(what: &str, result: Result<(), AudioError>) {
    if let Err(e) = result {
        warn!("audio {what} failed: {e}");
    }
}

/// Transport and mixing state over an optional backend. Without a backend
/// every operation only updates state, so the game runs silently.
pub struct AudioEngine<B: AudioBackend> {
    backend: Option<B>,
    rng: StdRng,
    music_ready: bool,
    wants_music: bool,
    music_playing: bool,
    /// Audio-clock time at which a fading voice is released.
    pending_release: Option<f64>,
    word_theme: bool,
    reverse: bool,
    warp_transition: bool,
    system_suspended: bool,
    logic_suspended: bool,
    music_volume: f32,
    duck: f32,
}

impl<B: AudioBackend> Default for AudioEngine<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: AudioBackend> AudioEngine<B> {
    pub fn new() -> Self {
        Self {
            backend: None,
            rng: StdRng::from_entropy(),
            music_ready: false,
            wants_music: false,
            music_playing: false,
            pending_release: None,
            word_theme: false,
            reverse: false,
            warp_transition: false,
            system_suspended: false,
            logic_suspended: false,
            music_volume: Settings::default().music_volume,
            duck: 1.0,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), ..Self::new() }
    }

    /// Wires a backend, renders the loop pair and uploads it. Music requested
    /// before the backend existed starts now.
    pub fn attach(&mut self, mut backend: B) {
        let (forward, reverse) = music::render_pair(backend.sample_rate());
        match backend.upload_music(&forward, &reverse) {
            Ok(()) => self.music_ready = true,
            Err(e) => warn!("music upload failed, continuing without music: {e}"),
        }
        debug!("audio attached, loop {:.2}s", forward.duration());
        self.backend = Some(backend);
        self.update_context();
        if self.wants_music {
            self.start_music(false);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    pub fn is_music_playing(&self) -> bool {
        self.music_playing
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    pub fn is_suspended(&self) -> bool {
        self.system_suspended || self.logic_suspended
    }

    pub fn handle(&mut self, command: AudioCommand) {
        match command {
            AudioCommand::Play(cue) => self.play(cue),
            AudioCommand::StartMusic { restart } => self.start_music(restart),
            AudioCommand::StopMusic => self.stop_music(),
            AudioCommand::SetReverse(on) => self.set_reverse(on),
            AudioCommand::SetWordTheme(on) => self.set_word_theme(on),
            AudioCommand::SetWarpTransition(on) => self.set_warp_transition(on),
            AudioCommand::RampToWarpSpeed { seconds } => self.ramp_to_warp_speed(seconds),
            AudioCommand::SetDucked(on) => self.set_ducked(on),
            AudioCommand::SuspendLogic(on) => self.set_logic_suspended(on),
            AudioCommand::Reset => self.reset(),
        }
    }

    fn music_target(&self) -> f32 {
        self.music_volume * self.duck
    }

    /// Idempotent while a voice is running. `restart` replaces the voice,
    /// which is how the forward and reverse loops are swapped. A voice that
    /// is fading out is always replaced, since its stop is already scheduled.
    pub fn start_music(&mut self, restart: bool) {
        self.wants_music = true;
        if !self.music_ready {
            return;
        }
        let target = self.music_target();
        let Some(backend) = self.backend.as_mut() else { return };

        if self.music_playing && (restart || self.pending_release.is_some()) {
            log_failure("stop", backend.stop_music_voice());
            self.music_playing = false;
        }
        self.pending_release = None;
        log_failure("music gain", backend.automate(Param::MusicGain, Ramp::Set(target)));

        if self.music_playing {
            return;
        }
        match backend.start_music_voice(self.reverse) {
            Ok(()) => {
                self.music_playing = true;
                self.update_playback();
            }
            Err(e) => warn!("music start failed: {e}"),
        }
    }

    /// Fades the music out and schedules the voice to stop when the fade
    /// ends. [`pump`](Self::pump) disconnects it afterwards if the host keeps
    /// calling it. A second call while fading does nothing.
    pub fn stop_music(&mut self) {
        self.wants_music = false;
        if !self.music_playing || self.pending_release.is_some() {
            return;
        }
        let Some(backend) = self.backend.as_mut() else { return };
        log_failure(
            "fade",
            backend.automate(Param::MusicGain, Ramp::Exponential { to: STOP_FLOOR, secs: STOP_FADE_SECS }),
        );
        let release_at = backend.now() + STOP_FADE_SECS as f64;
        log_failure("scheduled stop", backend.schedule_music_stop(release_at));
        self.pending_release = Some(release_at);
    }

    /// Releases a faded-out music voice once its fade is over. Call once per frame.
    pub fn pump(&mut self) {
        let Some(release_at) = self.pending_release else { return };
        let Some(backend) = self.backend.as_mut() else { return };
        if backend.now() >= release_at {
            log_failure("stop", backend.stop_music_voice());
            self.music_playing = false;
            self.pending_release = None;
        }
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        if self.reverse == reverse {
            return;
        }
        self.reverse = reverse;
        if self.wants_music {
            self.start_music(true);
        } else {
            self.update_playback();
        }
    }

    pub fn set_word_theme(&mut self, word: bool) {
        self.word_theme = word;
        self.update_playback();
    }

    pub fn set_warp_transition(&mut self, active: bool) {
        self.warp_transition = active;
    }

    /// Detune by objective kind, rate back to 1. Skipped during the warp
    /// slowdown so it does not fight the rate ramp.
    fn update_playback(&mut self) {
        if !self.music_playing || self.warp_transition {
            return;
        }
        let detune = if self.word_theme { WORD_DETUNE_CENTS } else { COLOR_DETUNE_CENTS };
        let Some(backend) = self.backend.as_mut() else { return };
        log_failure(
            "detune",
            backend.automate(Param::MusicDetune, Ramp::Linear { to: detune, secs: THEME_RAMP_SECS }),
        );
        log_failure(
            "rate",
            backend.automate(Param::MusicRate, Ramp::Linear { to: 1.0, secs: THEME_RAMP_SECS }),
        );
    }

    pub fn ramp_to_warp_speed(&mut self, seconds: f32) {
        if !self.music_playing {
            return;
        }
        if let Some(backend) = self.backend.as_mut() {
            log_failure(
                "warp rate",
                backend.automate(Param::MusicRate, Ramp::Linear { to: WARP_RATE, secs: seconds }),
            );
        }
    }

    fn apply_music_volume(&mut self, secs: f32) {
        let target = self.music_target();
        if !self.music_playing {
            return;
        }
        if let Some(backend) = self.backend.as_mut() {
            log_failure("music volume", backend.automate(Param::MusicGain, Ramp::Linear { to: target, secs }));
        }
    }

    pub fn set_ducked(&mut self, ducked: bool) {
        let target = if ducked { DUCKED_MULTIPLIER } else { 1.0 };
        if self.duck != target {
            self.duck = target;
            self.apply_music_volume(DUCK_RAMP_SECS);
        }
    }

    pub fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = volume;
        self.apply_music_volume(MUSIC_VOLUME_RAMP_SECS);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        if let Some(backend) = self.backend.as_mut() {
            log_failure("master volume", backend.automate(Param::MasterGain, Ramp::Set(volume)));
        }
    }

    pub fn set_effects_volume(&mut self, volume: f32) {
        if let Some(backend) = self.backend.as_mut() {
            log_failure("effects volume", backend.automate(Param::EffectsGain, Ramp::Set(volume)));
        }
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.set_master_volume(settings.master_volume);
        self.set_music_volume(settings.music_volume);
        self.set_effects_volume(settings.sfx_volume);
    }

    /// Tab hidden or backgrounded.
    pub fn set_system_suspended(&mut self, suspended: bool) {
        self.system_suspended = suspended;
        self.update_context();
    }

    /// Menu, pause or settings open.
    pub fn set_logic_suspended(&mut self, suspended: bool) {
        self.logic_suspended = suspended;
        self.update_context();
    }

    fn update_context(&mut self) {
        let suspended = self.is_suspended();
        if let Some(backend) = self.backend.as_mut() {
            log_failure("suspend", backend.set_suspended(suspended));
        }
    }

    /// Back to forward, unducked playback with no warp in flight.
    pub fn reset(&mut self) {
        self.warp_transition = false;
        self.set_reverse(false);
        self.set_ducked(false);
    }

    pub fn play(&mut self, cue: Cue) {
        if self.warp_transition {
            return;
        }
        let reverse = self.reverse;
        let Some(backend) = self.backend.as_mut() else { return };
        let patch = cues::patch_for(cue, reverse, &mut self.rng);
        log_failure("cue", backend.play_patch(&patch));
    }
}
