use stroop_runner::audio::patch::Patch;
use stroop_runner::audio::synth::StereoBuffer;
use stroop_runner::audio::{
    AudioBackend, AudioCommand, AudioEngine, AudioError, Cue, DUCKED_MULTIPLIER, Param, Ramp, STOP_FADE_SECS,
};
use stroop_runner::Settings;

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Upload,
    Start { reverse: bool },
    Stop,
    StopAt(f64),
    Automate(Param, Ramp),
    Play,
    Suspend(bool),
}

#[derive(Default)]
struct Recorder {
    clock: f64,
    fail_upload: bool,
    calls: Vec<Call>,
}

impl Recorder {
    fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    fn starts(&self) -> Vec<bool> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Start { reverse } => Some(*reverse),
                _ => None,
            })
            .collect()
    }
}

impl AudioBackend for Recorder {
    fn now(&self) -> f64 {
        self.clock
    }

    fn sample_rate(&self) -> f32 {
        22_050.0
    }

    fn upload_music(&mut self, _forward: &StereoBuffer, _reverse: &StereoBuffer) -> Result<(), AudioError> {
        if self.fail_upload {
            return Err(AudioError::Backend("decode failed".into()));
        }
        self.calls.push(Call::Upload);
        Ok(())
    }

    fn start_music_voice(&mut self, reverse: bool) -> Result<(), AudioError> {
        self.calls.push(Call::Start { reverse });
        Ok(())
    }

    fn stop_music_voice(&mut self) -> Result<(), AudioError> {
        self.calls.push(Call::Stop);
        Ok(())
    }

    fn schedule_music_stop(&mut self, at: f64) -> Result<(), AudioError> {
        self.calls.push(Call::StopAt(at));
        Ok(())
    }

    fn automate(&mut self, param: Param, ramp: Ramp) -> Result<(), AudioError> {
        self.calls.push(Call::Automate(param, ramp));
        Ok(())
    }

    fn play_patch(&mut self, _patch: &Patch) -> Result<(), AudioError> {
        self.calls.push(Call::Play);
        Ok(())
    }

    fn set_suspended(&mut self, suspended: bool) -> Result<(), AudioError> {
        self.calls.push(Call::Suspend(suspended));
        Ok(())
    }
}

fn engine() -> AudioEngine<Recorder> {
    let mut engine = AudioEngine::with_seed(1);
    engine.attach(Recorder::default());
    engine
}

fn recorder(engine: &AudioEngine<Recorder>) -> &Recorder {
    engine.backend().expect("attached")
}

#[test]
fn music_requested_before_attach_starts_on_attach() {
    let mut engine = AudioEngine::with_seed(2);
    engine.handle(AudioCommand::StartMusic { restart: true });
    assert!(!engine.is_music_playing());

    engine.attach(Recorder::default());
    assert!(engine.is_music_playing());
    let rec = recorder(&engine);
    assert_eq!(rec.calls[0], Call::Upload);
    assert_eq!(rec.starts(), vec![false]);
}

#[test]
fn start_is_idempotent_while_playing() {
    let mut engine = engine();
    engine.start_music(false);
    engine.start_music(false);
    assert_eq!(recorder(&engine).starts(), vec![false]);
}

#[test]
fn stop_fades_then_releases_once() {
    let mut engine = engine();
    engine.start_music(false);
    engine.stop_music();
    engine.stop_music();

    let fade = Call::Automate(Param::MusicGain, Ramp::Exponential { to: 0.001, secs: STOP_FADE_SECS });
    assert_eq!(recorder(&engine).count(&fade), 1);
    assert_eq!(recorder(&engine).count(&Call::StopAt(0.5)), 1);

    engine.pump();
    assert!(engine.is_music_playing());
    assert_eq!(recorder(&engine).count(&Call::Stop), 0);

    engine.backend_mut().expect("attached").clock = 0.6;
    engine.pump();
    engine.pump();
    assert!(!engine.is_music_playing());
    assert_eq!(recorder(&engine).count(&Call::Stop), 1);
}

#[test]
fn stopped_voice_ends_with_the_fade_without_another_frame() {
    let mut engine = engine();
    engine.start_music(false);
    engine.backend_mut().expect("attached").clock = 2.0;
    engine.handle(AudioCommand::StopMusic);

    let rec = recorder(&engine);
    assert_eq!(rec.count(&Call::StopAt(2.0 + STOP_FADE_SECS as f64)), 1);
    let fade = rec
        .calls
        .iter()
        .position(|c| matches!(c, Call::Automate(Param::MusicGain, Ramp::Exponential { .. })));
    let stop_at = rec.calls.iter().position(|c| matches!(c, Call::StopAt(_)));
    assert!(fade.is_some() && fade < stop_at);
}

#[test]
fn restarting_during_a_fade_replaces_the_voice() {
    let mut engine = engine();
    engine.start_music(false);
    engine.stop_music();
    engine.start_music(false);
    assert_eq!(recorder(&engine).starts(), vec![false, false]);
    assert_eq!(recorder(&engine).count(&Call::Stop), 1);

    engine.backend_mut().expect("attached").clock = 5.0;
    engine.pump();
    assert!(engine.is_music_playing());
    assert_eq!(recorder(&engine).count(&Call::Stop), 1);
}

#[test]
fn reversing_swaps_the_voice() {
    let mut engine = engine();
    engine.handle(AudioCommand::StartMusic { restart: false });
    engine.handle(AudioCommand::SetReverse(true));
    engine.handle(AudioCommand::SetReverse(true));
    assert!(engine.is_reverse());
    let rec = recorder(&engine);
    assert_eq!(rec.starts(), vec![false, true]);
    assert_eq!(rec.count(&Call::Stop), 1);

    engine.handle(AudioCommand::Reset);
    assert!(!engine.is_reverse());
    assert_eq!(recorder(&engine).starts(), vec![false, true, false]);
}

#[test]
fn cues_are_silent_during_warp_slowdown() {
    let mut engine = engine();
    engine.handle(AudioCommand::SetWarpTransition(true));
    engine.handle(AudioCommand::Play(Cue::Crash));
    assert_eq!(recorder(&engine).count(&Call::Play), 0);

    engine.handle(AudioCommand::SetWarpTransition(false));
    engine.handle(AudioCommand::Play(Cue::WarpRewind { set_index: 3 }));
    assert_eq!(recorder(&engine).count(&Call::Play), 1);
}

#[test]
fn warp_slowdown_holds_the_rate_ramp() {
    let mut engine = engine();
    engine.start_music(false);
    engine.set_warp_transition(true);
    engine.handle(AudioCommand::RampToWarpSpeed { seconds: 1.0 });
    engine.set_word_theme(true);

    let rec = recorder(&engine);
    assert_eq!(
        rec.calls.last(),
        Some(&Call::Automate(Param::MusicRate, Ramp::Linear { to: 0.5, secs: 1.0 }))
    );
}

#[test]
fn either_suspend_flag_keeps_the_context_suspended() {
    let mut engine = engine();
    engine.set_system_suspended(true);
    engine.set_logic_suspended(true);
    engine.set_system_suspended(false);
    assert!(engine.is_suspended());
    assert_eq!(recorder(&engine).calls.last(), Some(&Call::Suspend(true)));

    engine.handle(AudioCommand::SuspendLogic(false));
    assert!(!engine.is_suspended());
    assert_eq!(recorder(&engine).calls.last(), Some(&Call::Suspend(false)));
}

#[test]
fn ducking_ramps_music_to_a_fraction() {
    let mut engine = engine();
    engine.apply_settings(&Settings { music_volume: 0.5, ..Settings::default() });
    engine.start_music(false);
    engine.set_ducked(true);
    engine.set_ducked(true);

    let duck = Call::Automate(
        Param::MusicGain,
        Ramp::Linear { to: 0.5 * DUCKED_MULTIPLIER, secs: 0.2 },
    );
    assert_eq!(recorder(&engine).count(&duck), 1);
}

#[test]
fn failed_upload_leaves_the_game_silent_but_running() {
    let mut engine = AudioEngine::with_seed(3);
    engine.attach(Recorder { fail_upload: true, ..Recorder::default() });
    engine.start_music(true);
    assert!(!engine.is_music_playing());
    engine.play(Cue::LevelUp);
    assert_eq!(recorder(&engine).starts(), Vec::<bool>::new());
    assert_eq!(recorder(&engine).count(&Call::Play), 1);
}

#[test]
fn detached_engine_ignores_everything() {
    let mut engine: AudioEngine<Recorder> = AudioEngine::with_seed(4);
    for cmd in [
        AudioCommand::Reset,
        AudioCommand::StartMusic { restart: true },
        AudioCommand::Play(Cue::Objective),
        AudioCommand::SetReverse(true),
        AudioCommand::StopMusic,
    ] {
        engine.handle(cmd);
    }
    engine.pump();
    assert!(!engine.is_attached());
    assert!(!engine.is_music_playing());
}
