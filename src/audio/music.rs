//! Background loop: two bars of synthwave at 120 BPM.

use super::patch::{Automation, FilterKind, Patch, Voice, Waveform};
use super::synth::{self, StereoBuffer};

pub const BPM: f32 = 120.0;
pub const MEASURES: usize = 2;
pub const BEATS: usize = MEASURES * 4;

const BASS_ROOT: f32 = 65.41; // C2
const BASS_TURN: f32 = 49.00; // G1
const PAD_ROOT: f32 = 130.81; // C3
const PAD_THIRD: f32 = 155.56; // Eb3

pub fn seconds_per_beat() -> f32 {
    60.0 / BPM
}

pub fn loop_seconds() -> f32 {
    seconds_per_beat() * BEATS as f32
}

fn kick(at: f32) -> Voice {
    Voice::oscillator(
        Waveform::Sine,
        Automation::constant(150.0).exponential(0.5, 0.01),
        Automation::constant(0.8).exponential(0.5, 0.001),
    )
    .starting_at(at)
    .stopping_after(0.5)
}

fn snare(at: f32, seed: u64) -> [Voice; 2] {
    [
        Voice::noise(0.2, 1, seed, Automation::constant(0.4).exponential(0.15, 0.01))
            .through(FilterKind::HighPass, Automation::constant(800.0), 1.0)
            .starting_at(at),
        Voice::oscillator(
            Waveform::Triangle,
            Automation::constant(200.0).exponential(0.1, 100.0),
            Automation::constant(0.2).exponential(0.1, 0.01),
        )
        .starting_at(at)
        .stopping_after(0.15),
    ]
}

fn hat(at: f32, seed: u64) -> Voice {
    Voice::noise(0.05, 1, seed, Automation::constant(0.05).exponential(0.03, 0.01))
        .through(FilterKind::HighPass, Automation::constant(6000.0), 1.0)
        .starting_at(at)
}

/// Rolling eighth-note bass: C2 throughout, G1 on the last beat.
fn bass() -> Voice {
    let eighth = seconds_per_beat() / 2.0;
    let eighths = BEATS * 2;
    let mut frequency = Automation::constant(BASS_ROOT);
    let mut gain = Automation::constant(0.4);
    for i in 0..eighths {
        let t = i as f32 * eighth;
        let f = if i >= eighths - 2 { BASS_TURN } else { BASS_ROOT };
        frequency = frequency.set(t, f);
        gain = gain.set(t, 0.4).exponential(t + 0.1, 0.1).set(t + eighth - 0.02, 0.0);
    }
    Voice::oscillator(Waveform::Sawtooth, frequency, gain).through(
        FilterKind::LowPass,
        Automation::constant(800.0),
        1.0,
    )
}

fn pad(freq: f32, detune: f32) -> Voice {
    Voice::oscillator(Waveform::Sawtooth, Automation::constant(freq), Automation::constant(0.08))
        .detuned(detune)
        .through(FilterKind::LowPass, Automation::constant(2500.0), 1.0)
}

/// The full loop as one patch.
pub fn score() -> Patch {
    let spb = seconds_per_beat();
    let mut voices = Vec::new();
    for beat in 0..BEATS {
        voices.push(kick(beat as f32 * spb));
    }
    for beat in (1..BEATS).step_by(2) {
        voices.extend(snare(beat as f32 * spb, 0x5A4E + beat as u64));
    }
    for sixteenth in 0..BEATS * 4 {
        voices.push(hat(sixteenth as f32 * spb / 4.0, 0x4A7 + sixteenth as u64));
    }
    voices.push(bass());
    voices.push(pad(PAD_ROOT, 0.0));
    voices.push(pad(PAD_THIRD, 10.0));
    Patch::new(voices)
}

/// Forward loop and its sample-reversed twin.
pub fn render_pair(sample_rate: f32) -> (StereoBuffer, StereoBuffer) {
    let forward = synth::render(&score(), sample_rate, loop_seconds());
    let reverse = reversed(&forward);
    (forward, reverse)
}

pub fn reversed(buffer: &StereoBuffer) -> StereoBuffer {
    buffer.reversed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_is_two_bars_at_120_bpm() {
        assert_eq!(loop_seconds(), 4.0);
        let p = score();
        // 8 kicks, 4 snares of two voices, 32 hats, bass, two pads
        assert_eq!(p.voices.len(), 8 + 8 + 32 + 3);
    }

    #[test]
    fn reverse_twin_matches_forward_backwards() {
        let (fwd, rev) = render_pair(2_000.0);
        assert_eq!(fwd.frames(), 8_000);
        assert_eq!(rev.frames(), fwd.frames());
        let n = fwd.frames();
        for i in (0..n).step_by(97) {
            assert_eq!(rev.left[i], fwd.left[n - 1 - i]);
            assert_eq!(rev.right[i], fwd.right[n - 1 - i]);
        }
        assert!(fwd.left.iter().any(|s| s.abs() > 0.1));
    }
}
