//! Web Audio implementation of [`AudioBackend`].

use std::collections::HashMap;

use js_sys::Error as JsError;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState, AudioNode, AudioParam,
    AudioScheduledSourceNode, BiquadFilterType, GainNode, OscillatorType,
};

use super::patch::{Automation, FilterKind, Patch, Source, Step, Voice, Waveform};
use super::synth::{self, StereoBuffer};
use super::{AudioBackend, AudioError, Param, Ramp};

impl From<JsValue> for AudioError {
    fn from(value: JsValue) -> Self {
        let message = match value.dyn_ref::<JsError>() {
            Some(err) => String::from(err.message()),
            None => value.as_string().unwrap_or_else(|| format!("{value:?}")),
        };
        AudioError::Backend(message)
    }
}

/// Exponential ramps cannot reach zero.
const EXP_FLOOR: f32 = 1e-4;

pub struct WebAudioBackend {
    ctx: AudioContext,
    master: GainNode,
    sfx: GainNode,
    music_gain: GainNode,
    forward: Option<AudioBuffer>,
    reverse: Option<AudioBuffer>,
    music_voice: Option<AudioBufferSourceNode>,
    noise_cache: HashMap<(u64, usize, usize), AudioBuffer>,
}

impl WebAudioBackend {
    pub fn new() -> Result<Self, AudioError> {
        let ctx = AudioContext::new()?;
        let master = ctx.create_gain()?;
        let sfx = ctx.create_gain()?;
        let music_gain = ctx.create_gain()?;
        master.connect_with_audio_node(&ctx.destination())?;
        sfx.connect_with_audio_node(&master)?;
        music_gain.connect_with_audio_node(&master)?;
        Ok(Self {
            ctx,
            master,
            sfx,
            music_gain,
            forward: None,
            reverse: None,
            music_voice: None,
            noise_cache: HashMap::new(),
        })
    }

    fn to_buffer(&self, buf: &StereoBuffer) -> Result<AudioBuffer, AudioError> {
        let out = self.ctx.create_buffer(2, buf.frames().max(1) as u32, buf.sample_rate)?;
        out.copy_to_channel(&buf.left, 0)?;
        out.copy_to_channel(&buf.right, 1)?;
        Ok(out)
    }

    fn noise_buffer(&mut self, duration: f32, hold: usize, seed: u64) -> Result<AudioBuffer, AudioError> {
        let sr = self.ctx.sample_rate();
        let frames = ((duration * sr) as usize).max(1);
        if let Some(b) = self.noise_cache.get(&(seed, hold, frames)) {
            return Ok(b.clone());
        }
        let samples = synth::noise(frames, hold, seed);
        let b = self.ctx.create_buffer(1, frames as u32, sr)?;
        b.copy_to_channel(&samples, 0)?;
        self.noise_cache.insert((seed, hold, frames), b.clone());
        Ok(b)
    }

    fn param(&self, param: Param) -> Option<AudioParam> {
        match param {
            Param::MasterGain => Some(self.master.gain()),
            Param::EffectsGain => Some(self.sfx.gain()),
            Param::MusicGain => Some(self.music_gain.gain()),
            Param::MusicDetune => self.music_voice.as_ref().map(|v| v.detune()),
            Param::MusicRate => self.music_voice.as_ref().map(|v| v.playback_rate()),
        }
    }

    fn schedule_voice(&mut self, voice: &Voice, t0: f64) -> Result<(), AudioError> {
        let start = t0 + voice.start as f64;
        let stop = start + (voice.end() - voice.start) as f64;

        let gain = self.ctx.create_gain()?;
        schedule(&gain.gain(), &voice.gain, start)?;

        let mut tail: AudioNode = gain.clone().unchecked_into();
        if let Some(f) = &voice.filter {
            let bq = self.ctx.create_biquad_filter()?;
            bq.set_type(match f.kind {
                FilterKind::LowPass => BiquadFilterType::Lowpass,
                FilterKind::HighPass => BiquadFilterType::Highpass,
            });
            bq.q().set_value(f.q);
            schedule(&bq.frequency(), &f.cutoff, start)?;
            bq.connect_with_audio_node(&gain)?;
            tail = bq.unchecked_into();
        }
        gain.connect_with_audio_node(&self.sfx)?;

        match &voice.source {
            Source::Oscillator { waveform, frequency, detune_cents } => {
                let osc = self.ctx.create_oscillator()?;
                osc.set_type(oscillator_type(*waveform));
                osc.detune().set_value(*detune_cents);
                schedule(&osc.frequency(), frequency, start)?;
                if let Some(m) = &voice.modulator {
                    let lfo = self.ctx.create_oscillator()?;
                    lfo.set_type(oscillator_type(m.waveform));
                    lfo.frequency().set_value(m.frequency);
                    let depth = self.ctx.create_gain()?;
                    depth.gain().set_value(m.depth);
                    lfo.connect_with_audio_node(&depth)?;
                    depth.connect_with_audio_param(&osc.frequency())?;
                    play_between(&lfo, start, stop)?;
                }
                osc.connect_with_audio_node(&tail)?;
                play_between(&osc, start, stop)?;
            }
            Source::Noise { duration, hold, seed } => {
                let buffer = self.noise_buffer(*duration, *hold, *seed)?;
                let src = self.ctx.create_buffer_source()?;
                src.set_buffer(Some(&buffer));
                src.connect_with_audio_node(&tail)?;
                play_between(&src, start, stop)?;
            }
        }
        Ok(())
    }
}

fn play_between(node: &AudioScheduledSourceNode, start: f64, stop: f64) -> Result<(), AudioError> {
    node.start_with_when(start)?;
    node.stop_with_when(stop)?;
    Ok(())
}

fn oscillator_type(w: Waveform) -> OscillatorType {
    match w {
        Waveform::Sine => OscillatorType::Sine,
        Waveform::Square => OscillatorType::Square,
        Waveform::Sawtooth => OscillatorType::Sawtooth,
        Waveform::Triangle => OscillatorType::Triangle,
    }
}

fn schedule(param: &AudioParam, automation: &Automation, t0: f64) -> Result<(), AudioError> {
    param.set_value_at_time(automation.initial, t0)?;
    for step in &automation.steps {
        match *step {
            Step::Set { at, value } => {
                param.set_value_at_time(value, t0 + at as f64)?;
            }
            Step::Linear { at, value } => {
                param.linear_ramp_to_value_at_time(value, t0 + at as f64)?;
            }
            Step::Exponential { at, value } => {
                param.exponential_ramp_to_value_at_time(value.max(EXP_FLOOR), t0 + at as f64)?;
            }
        }
    }
    Ok(())
}

impl AudioBackend for WebAudioBackend {
    fn now(&self) -> f64 {
        self.ctx.current_time()
    }

    fn sample_rate(&self) -> f32 {
        self.ctx.sample_rate()
    }

    fn upload_music(&mut self, forward: &StereoBuffer, reverse: &StereoBuffer) -> Result<(), AudioError> {
        self.forward = Some(self.to_buffer(forward)?);
        self.reverse = Some(self.to_buffer(reverse)?);
        Ok(())
    }

    fn start_music_voice(&mut self, reverse: bool) -> Result<(), AudioError> {
        let buffer = if reverse { &self.reverse } else { &self.forward };
        let buffer = buffer.as_ref().ok_or(AudioError::MusicNotReady)?;
        let src = self.ctx.create_buffer_source()?;
        src.set_buffer(Some(buffer));
        src.set_loop(true);
        src.connect_with_audio_node(&self.music_gain)?;
        AudioScheduledSourceNode::start(&src)?;
        self.music_voice = Some(src);
        Ok(())
    }

    fn stop_music_voice(&mut self) -> Result<(), AudioError> {
        if let Some(src) = self.music_voice.take() {
            AudioScheduledSourceNode::stop(&src)?;
            src.disconnect()?;
        }
        Ok(())
    }

    fn schedule_music_stop(&mut self, at: f64) -> Result<(), AudioError> {
        if let Some(src) = &self.music_voice {
            AudioScheduledSourceNode::stop_with_when(src, at)?;
        }
        Ok(())
    }

    fn automate(&mut self, param: Param, ramp: Ramp) -> Result<(), AudioError> {
        let Some(p) = self.param(param) else { return Ok(()) };
        let now = self.now();
        p.cancel_scheduled_values(now)?;
        match ramp {
            Ramp::Set(v) => {
                p.set_value_at_time(v, now)?;
            }
            Ramp::Linear { to, secs } => {
                p.set_value_at_time(p.value(), now)?;
                p.linear_ramp_to_value_at_time(to, now + secs as f64)?;
            }
            Ramp::Exponential { to, secs } => {
                p.set_value_at_time(p.value().max(EXP_FLOOR), now)?;
                p.exponential_ramp_to_value_at_time(to.max(EXP_FLOOR), now + secs as f64)?;
            }
        }
        Ok(())
    }

    fn play_patch(&mut self, patch: &Patch) -> Result<(), AudioError> {
        let t0 = self.now();
        for voice in &patch.voices {
            self.schedule_voice(voice, t0)?;
        }
        Ok(())
    }

    fn set_suspended(&mut self, suspended: bool) -> Result<(), AudioError> {
        let state = self.ctx.state();
        if suspended && state == AudioContextState::Running {
            let _ = self.ctx.suspend()?;
        } else if !suspended && state == AudioContextState::Suspended {
            let _ = self.ctx.resume()?;
        }
        Ok(())
    }
}
