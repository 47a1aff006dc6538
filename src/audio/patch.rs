//! Declarative sound descriptions.
//!
//! A [`Patch`] is a list of voices, each a source feeding an optional filter
//! and a gain envelope. Times are seconds relative to the voice's start.
//! Backends interpret patches; nothing here touches an audio device.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// One sample at `phase` (cycles, any real number).
    pub fn sample(self, phase: f64) -> f32 {
        let p = phase - phase.floor();
        let v = match self {
            Waveform::Sine => (p * std::f64::consts::TAU).sin(),
            Waveform::Square => {
                if p < 0.5 { 1.0 } else { -1.0 }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        };
        v as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    Set { at: f32, value: f32 },
    Linear { at: f32, value: f32 },
    Exponential { at: f32, value: f32 },
}

impl Step {
    pub fn at(&self) -> f32 {
        match *self {
            Step::Set { at, .. } | Step::Linear { at, .. } | Step::Exponential { at, .. } => at,
        }
    }
}

/// Parameter automation: a value at time zero followed by ordered events.
#[derive(Clone, Debug, PartialEq)]
pub struct Automation {
    pub initial: f32,
    pub steps: Vec<Step>,
}

impl Automation {
    pub fn constant(value: f32) -> Self {
        Self { initial: value, steps: Vec::new() }
    }

    pub fn set(mut self, at: f32, value: f32) -> Self {
        self.steps.push(Step::Set { at, value });
        self
    }

    pub fn linear(mut self, at: f32, value: f32) -> Self {
        self.steps.push(Step::Linear { at, value });
        self
    }

    pub fn exponential(mut self, at: f32, value: f32) -> Self {
        self.steps.push(Step::Exponential { at, value });
        self
    }

    pub fn is_constant(&self) -> bool {
        self.steps.is_empty()
    }

    /// Value at `t`, ramping from the previous event the way Web Audio does.
    pub fn value_at(&self, t: f32) -> f32 {
        let mut prev_t = 0.0_f32;
        let mut prev_v = self.initial;
        for step in &self.steps {
            match *step {
                Step::Set { at, value } => {
                    if t < at {
                        return prev_v;
                    }
                    prev_t = at;
                    prev_v = value;
                }
                Step::Linear { at, value } => {
                    if t < at {
                        let f = ramp_fraction(t, prev_t, at);
                        return prev_v + (value - prev_v) * f;
                    }
                    prev_t = at;
                    prev_v = value;
                }
                Step::Exponential { at, value } => {
                    if t < at {
                        let f = ramp_fraction(t, prev_t, at);
                        if prev_v > 0.0 && value > 0.0 {
                            return prev_v * (value / prev_v).powf(f);
                        }
                        return prev_v + (value - prev_v) * f;
                    }
                    prev_t = at;
                    prev_v = value;
                }
            }
        }
        prev_v
    }

    /// Time of the last event.
    pub fn end(&self) -> f32 {
        self.steps.iter().map(Step::at).fold(0.0, f32::max)
    }
}

fn ramp_fraction(t: f32, from: f32, to: f32) -> f32 {
    if to <= from {
        1.0
    } else {
        ((t - from) / (to - from)).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    Oscillator {
        waveform: Waveform,
        frequency: Automation,
        detune_cents: f32,
    },
    /// Seeded white noise; `hold` repeats each random sample that many times.
    Noise { duration: f32, hold: usize, seed: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub kind: FilterKind,
    pub cutoff: Automation,
    pub q: f32,
}

/// Frequency modulation: `depth` Hz of `waveform` at `frequency` Hz added to the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Modulator {
    pub waveform: Waveform,
    pub frequency: f32,
    pub depth: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Voice {
    pub source: Source,
    pub filter: Option<Filter>,
    pub gain: Automation,
    pub modulator: Option<Modulator>,
    /// Offset from the patch trigger, seconds.
    pub start: f32,
    /// Voice length; `None` plays until the source ends (noise) or the render ends.
    pub stop: Option<f32>,
}

impl Voice {
    pub fn oscillator(waveform: Waveform, frequency: Automation, gain: Automation) -> Self {
        Self {
            source: Source::Oscillator { waveform, frequency, detune_cents: 0.0 },
            filter: None,
            gain,
            modulator: None,
            start: 0.0,
            stop: None,
        }
    }

    pub fn noise(duration: f32, hold: usize, seed: u64, gain: Automation) -> Self {
        Self {
            source: Source::Noise { duration, hold, seed },
            filter: None,
            gain,
            modulator: None,
            start: 0.0,
            stop: None,
        }
    }

    pub fn starting_at(mut self, start: f32) -> Self {
        self.start = start;
        self
    }

    pub fn stopping_after(mut self, stop: f32) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn through(mut self, kind: FilterKind, cutoff: Automation, q: f32) -> Self {
        self.filter = Some(Filter { kind, cutoff, q });
        self
    }

    pub fn modulated(mut self, waveform: Waveform, frequency: f32, depth: f32) -> Self {
        self.modulator = Some(Modulator { waveform, frequency, depth });
        self
    }

    pub fn detuned(mut self, cents: f32) -> Self {
        if let Source::Oscillator { detune_cents, .. } = &mut self.source {
            *detune_cents = cents;
        }
        self
    }

    /// Seconds after the patch trigger at which the voice falls silent.
    pub fn end(&self) -> f32 {
        let natural = match &self.source {
            Source::Noise { duration, .. } => *duration,
            Source::Oscillator { .. } => self.gain.end(),
        };
        self.start + self.stop.unwrap_or(natural)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    pub voices: Vec<Voice>,
}

impl Patch {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    pub fn duration(&self) -> f32 {
        self.voices.iter().map(Voice::end).fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automation_follows_ramps() {
        let a = Automation::constant(0.2).linear(0.2, 0.4).set(0.3, 0.0);
        assert_eq!(a.value_at(0.0), 0.2);
        assert!((a.value_at(0.1) - 0.3).abs() < 1e-6);
        assert_eq!(a.value_at(0.25), 0.4);
        assert_eq!(a.value_at(0.5), 0.0);
        assert_eq!(a.end(), 0.3);
    }

    #[test]
    fn exponential_ramp_is_geometric() {
        let a = Automation::constant(1.0).exponential(1.0, 0.01);
        assert!((a.value_at(0.5) - 0.1).abs() < 1e-4);
    }

    #[test]
    fn voice_end_honors_stop() {
        let v = Voice::oscillator(Waveform::Sine, Automation::constant(440.0), Automation::constant(0.1).linear(0.1, 0.0))
            .starting_at(0.2)
            .stopping_after(0.15);
        assert!((v.end() - 0.35).abs() < 1e-6);
        let n = Voice::noise(0.4, 4, 1, Automation::constant(0.5));
        assert!((n.end() - 0.4).abs() < 1e-6);
    }
}
