//! Offline renderer for [`Patch`]es.
//!
//! Used for the background loop, which is rendered once into a buffer and
//! then played on a looping music voice.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::patch::{FilterKind, Patch, Source, Voice};

/// Coefficients are refreshed this often while a cutoff is being automated.
const CONTROL_BLOCK: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub struct StereoBuffer {
    pub sample_rate: f32,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBuffer {
    pub fn silent(sample_rate: f32, frames: usize) -> Self {
        Self {
            sample_rate,
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration(&self) -> f32 {
        self.frames() as f32 / self.sample_rate
    }

    /// Copy with every channel read back to front.
    pub fn reversed(&self) -> Self {
        Self {
            sample_rate: self.sample_rate,
            left: self.left.iter().rev().copied().collect(),
            right: self.right.iter().rev().copied().collect(),
        }
    }
}

/// Seeded noise in [-1, 1), each value held for `hold` samples.
pub fn noise(frames: usize, hold: usize, seed: u64) -> Vec<f32> {
    let hold = hold.max(1);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(frames);
    let mut current = 0.0_f32;
    for i in 0..frames {
        if i % hold == 0 {
            current = rng.gen_range(-1.0..1.0);
        }
        out.push(current);
    }
    out
}

/// Mono RBJ biquad, direct form II transposed.
#[derive(Clone, Debug)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
    sample_rate: f64,
}

impl Biquad {
    pub fn new(kind: FilterKind, cutoff: f32, q: f32, sample_rate: f32) -> Self {
        let mut f = Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate: sample_rate as f64,
        };
        f.set(kind, cutoff, q);
        f
    }

    pub fn set(&mut self, kind: FilterKind, cutoff: f32, q: f32) {
        let nyquist = self.sample_rate / 2.0;
        let f0 = (cutoff as f64).clamp(10.0, nyquist * 0.99);
        let q = (q as f64).max(0.1);
        let w0 = std::f64::consts::TAU * f0 / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2) = match kind {
            FilterKind::LowPass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            FilterKind::HighPass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
        };
        let a0 = 1.0 + alpha;
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let x = x as f64;
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y as f32
    }
}

fn render_voice(voice: &Voice, sample_rate: f32, out: &mut [f32]) {
    let sr = sample_rate as f64;
    let first = (voice.start as f64 * sr).round() as usize;
    if first >= out.len() {
        return;
    }
    let last = out.len().min((voice.end() as f64 * sr).round() as usize);
    let noise_buf = match &voice.source {
        Source::Noise { duration, hold, seed } => Some(noise((*duration as f64 * sr) as usize, *hold, *seed)),
        Source::Oscillator { .. } => None,
    };
    // Oscillators without an explicit stop run to the end of the buffer.
    let last = match (&voice.source, voice.stop) {
        (Source::Oscillator { .. }, None) => out.len(),
        _ => last,
    };

    let mut filter = voice.filter.as_ref().map(|f| {
        (Biquad::new(f.kind, f.cutoff.value_at(0.0), f.q, sample_rate), f)
    });
    let mut phase = 0.0_f64;
    let mut mod_phase = 0.0_f64;

    for (n, slot) in out.iter_mut().enumerate().take(last).skip(first) {
        let i = n - first;
        let t = (i as f64 / sr) as f32;
        let raw = match &voice.source {
            Source::Oscillator { waveform, frequency, detune_cents } => {
                let mut freq = frequency.value_at(t) as f64 * 2f64.powf(*detune_cents as f64 / 1200.0);
                if let Some(m) = &voice.modulator {
                    freq += m.depth as f64 * m.waveform.sample(mod_phase) as f64;
                    mod_phase += m.frequency as f64 / sr;
                }
                let s = waveform.sample(phase);
                phase += freq / sr;
                s
            }
            Source::Noise { .. } => match noise_buf.as_ref().and_then(|b| b.get(i)) {
                Some(s) => *s,
                None => break,
            },
        };
        let filtered = match filter.as_mut() {
            Some((bq, spec)) => {
                if !spec.cutoff.is_constant() && i % CONTROL_BLOCK == 0 {
                    bq.set(spec.kind, spec.cutoff.value_at(t), spec.q);
                }
                bq.process(raw)
            }
            None => raw,
        };
        *slot += filtered * voice.gain.value_at(t);
    }
}

/// Renders `patch` for `seconds` into a stereo buffer (mono mix on both channels).
pub fn render(patch: &Patch, sample_rate: f32, seconds: f32) -> StereoBuffer {
    let frames = (sample_rate as f64 * seconds as f64).round() as usize;
    let mut mono = vec![0.0_f32; frames];
    for voice in &patch.voices {
        render_voice(voice, sample_rate, &mut mono);
    }
    StereoBuffer {
        sample_rate,
        right: mono.clone(),
        left: mono,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::patch::{Automation, Waveform};

    #[test]
    fn sample_and_hold_noise_repeats() {
        let n = noise(16, 4, 3);
        for chunk in n.chunks(4) {
            assert!(chunk.iter().all(|&s| s == chunk[0]));
        }
        assert_eq!(n, noise(16, 4, 3));
    }

    #[test]
    fn lowpass_attenuates_high_tone() {
        let sr = 8_000.0;
        let tone = |freq: f32| {
            let v = Voice::oscillator(Waveform::Sine, Automation::constant(freq), Automation::constant(1.0))
                .through(FilterKind::LowPass, Automation::constant(200.0), 0.707);
            let buf = render(&Patch::new(vec![v]), sr, 0.5);
            buf.left[2000..].iter().map(|s| s.abs()).fold(0.0, f32::max)
        };
        assert!(tone(3_000.0) < 0.05);
        assert!(tone(50.0) > 0.8);
    }

    #[test]
    fn voice_is_silent_before_start_and_after_stop() {
        let v = Voice::oscillator(Waveform::Square, Automation::constant(100.0), Automation::constant(0.5))
            .starting_at(0.1)
            .stopping_after(0.1);
        let buf = render(&Patch::new(vec![v]), 1_000.0, 0.3);
        assert!(buf.left[..100].iter().all(|&s| s == 0.0));
        assert!(buf.left[100..200].iter().any(|&s| s != 0.0));
        assert!(buf.left[200..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn reversed_reads_back_to_front() {
        let buf = StereoBuffer {
            sample_rate: 4.0,
            left: vec![1.0, 2.0, 3.0],
            right: vec![4.0, 5.0, 6.0],
        };
        let r = buf.reversed();
        assert_eq!(r.left, vec![3.0, 2.0, 1.0]);
        assert_eq!(r.right, vec![6.0, 5.0, 4.0]);
        assert_eq!(r.reversed(), buf);
    }
}
