//! One-shot sound effects, built as patches.

use rand::Rng;

use super::Cue;
use super::patch::{Automation, FilterKind, Patch, Voice, Waveform};

/// Fixed so backends can cache the crash buffer.
pub const CRASH_NOISE_SEED: u64 = 0xC0A5;

const LEVEL_UP_NOTES: [f32; 6] = [440.0, 554.37, 659.25, 880.0, 1108.73, 1318.51];
const LIFE_GAINED_NOTES: [f32; 4] = [523.25, 659.25, 783.99, 1046.50];
/// C4 D4 E4 G4 C5
const REWIND_NOTES: [f32; 5] = [261.63, 293.66, 329.63, 392.00, 523.25];
const SPIN_BLIPS: usize = 5;

pub fn patch_for<R: Rng + ?Sized>(cue: Cue, reverse: bool, rng: &mut R) -> Patch {
    match cue {
        Cue::Crash => crash(),
        Cue::LevelUp => level_up(reverse),
        Cue::Objective => objective(reverse),
        Cue::Crate => crate_pickup(reverse),
        Cue::LifeLost => life_lost(),
        Cue::LifeGained => life_gained(),
        Cue::Wild => wild(reverse),
        Cue::Spin => spin(rng),
        Cue::WarpRewind { set_index } => warp_rewind(set_index),
    }
}

fn crash() -> Patch {
    Patch::new(vec![Voice::noise(
        0.4,
        4,
        CRASH_NOISE_SEED,
        Automation::constant(0.5).exponential(0.4, 0.01),
    )])
}

fn level_up(reverse: bool) -> Patch {
    let mut notes = LEVEL_UP_NOTES;
    if reverse {
        notes.reverse();
    }
    let voices = notes
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            Voice::oscillator(Waveform::Square, Automation::constant(f), Automation::constant(0.1).linear(0.1, 0.0))
                .starting_at(i as f32 * 0.06)
                .stopping_after(0.15)
        })
        .collect();
    Patch::new(voices)
}

/// Chime with a low-pass sweep; the sweep closes instead of opening when reversed.
fn objective(reverse: bool) -> Patch {
    let (gain, cutoff) = if reverse {
        (
            Automation::constant(0.01).linear(0.2, 0.2).set(0.3, 0.0),
            Automation::constant(3000.0).exponential(0.2, 200.0),
        )
    } else {
        (
            Automation::constant(0.2).exponential(0.3, 0.01),
            Automation::constant(200.0).exponential(0.2, 3000.0),
        )
    };
    Patch::new(vec![
        Voice::oscillator(Waveform::Sawtooth, Automation::constant(800.0), gain)
            .through(FilterKind::LowPass, cutoff, 1.0)
            .stopping_after(0.3),
    ])
}

fn crate_pickup(reverse: bool) -> Patch {
    let (from, to) = if reverse { (1800.0, 1200.0) } else { (1200.0, 1800.0) };
    Patch::new(vec![
        Voice::oscillator(
            Waveform::Sine,
            Automation::constant(from).set(0.1, to),
            Automation::constant(0.1).linear(0.3, 0.0),
        )
        .stopping_after(0.3),
    ])
}

fn life_lost() -> Patch {
    Patch::new(vec![
        Voice::oscillator(
            Waveform::Sine,
            Automation::constant(600.0),
            Automation::constant(0.2).exponential(0.6, 0.01),
        )
        .modulated(Waveform::Sawtooth, 20.0, 300.0)
        .stopping_after(0.6),
    ])
}

fn life_gained() -> Patch {
    let voices = LIFE_GAINED_NOTES
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            Voice::oscillator(
                Waveform::Sine,
                Automation::constant(f),
                Automation::constant(0.0).linear(0.05, 0.1).exponential(0.6, 0.001),
            )
            .starting_at(i as f32 * 0.05)
            .stopping_after(0.7)
        })
        .collect();
    Patch::new(voices)
}

fn wild(reverse: bool) -> Patch {
    let frequency = if reverse {
        Automation::constant(1200.0).linear(0.2, 300.0).linear(0.3, 800.0).linear(0.4, 200.0)
    } else {
        Automation::constant(200.0).linear(0.1, 800.0).linear(0.2, 300.0).linear(0.4, 1200.0)
    };
    Patch::new(vec![
        Voice::oscillator(Waveform::Square, frequency, Automation::constant(0.2).exponential(0.4, 0.01))
            .modulated(Waveform::Sawtooth, 50.0, 500.0)
            .stopping_after(0.4),
    ])
}

fn spin<R: Rng + ?Sized>(rng: &mut R) -> Patch {
    let voices = (0..SPIN_BLIPS)
        .map(|i| {
            let f = 800.0 + rng.gen_range(0.0..400.0);
            Voice::oscillator(
                Waveform::Square,
                Automation::constant(f),
                Automation::constant(0.1).exponential(0.03, 0.001),
            )
            .starting_at(i as f32 * 0.05)
            .stopping_after(0.04)
        })
        .collect();
    Patch::new(voices)
}

/// Step 0 for set index 5 up to step 4 for set index 1.
pub fn rewind_step(set_index: u32) -> usize {
    (5_i64 - set_index as i64).clamp(0, 4) as usize
}

/// Chime that climbs in pitch and volume as the rewind approaches row 1.
fn warp_rewind(set_index: u32) -> Patch {
    let step = rewind_step(set_index);
    let freq = REWIND_NOTES[step];
    let vol = 0.3 + step as f32 * 0.175;
    Patch::new(vec![
        Voice::oscillator(
            Waveform::Sine,
            Automation::constant(freq),
            Automation::constant(0.0).linear(0.02, vol).exponential(0.5, 0.001),
        )
        .stopping_after(0.5),
        Voice::oscillator(
            Waveform::Triangle,
            Automation::constant(freq * 2.0),
            Automation::constant(0.0).linear(0.02, vol * 0.3).exponential(0.3, 0.001),
        )
        .detuned(5.0)
        .stopping_after(0.5),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::patch::Source;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(1)
    }

    fn first_frequency(p: &Patch) -> f32 {
        match &p.voices[0].source {
            Source::Oscillator { frequency, .. } => frequency.initial,
            Source::Noise { .. } => panic!("noise voice"),
        }
    }

    #[test]
    fn level_up_descends_when_reversed() {
        let fwd = patch_for(Cue::LevelUp, false, &mut rng());
        let rev = patch_for(Cue::LevelUp, true, &mut rng());
        assert_eq!(fwd.voices.len(), 6);
        assert_eq!(first_frequency(&fwd), 440.0);
        assert_eq!(first_frequency(&rev), 1318.51);
    }

    #[test]
    fn rewind_chime_rises_toward_row_one() {
        let row5 = patch_for(Cue::WarpRewind { set_index: 5 }, true, &mut rng());
        let row1 = patch_for(Cue::WarpRewind { set_index: 1 }, true, &mut rng());
        assert_eq!(first_frequency(&row5), 261.63);
        assert_eq!(first_frequency(&row1), 523.25);
        let peak = |p: &Patch| p.voices[0].gain.value_at(0.02);
        assert!((peak(&row5) - 0.3).abs() < 1e-6);
        assert!((peak(&row1) - 1.0).abs() < 1e-6);
        assert_eq!(rewind_step(9), 0);
    }

    #[test]
    fn crash_is_held_noise() {
        let p = patch_for(Cue::Crash, false, &mut rng());
        assert_eq!(
            p.voices[0].source,
            Source::Noise { duration: 0.4, hold: 4, seed: CRASH_NOISE_SEED }
        );
        assert!((p.duration() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn spin_blips_stay_in_band() {
        let p = patch_for(Cue::Spin, false, &mut rng());
        assert_eq!(p.voices.len(), SPIN_BLIPS);
        for v in &p.voices {
            let Source::Oscillator { frequency, .. } = &v.source else { panic!() };
            assert!((800.0..1200.0).contains(&frequency.initial));
        }
    }

    #[test]
    fn objective_sweep_direction_flips() {
        let cutoff = |p: &Patch| p.voices[0].filter.as_ref().map(|f| f.cutoff.initial);
        assert_eq!(cutoff(&patch_for(Cue::Objective, false, &mut rng())), Some(200.0));
        assert_eq!(cutoff(&patch_for(Cue::Objective, true, &mut rng())), Some(3000.0));
    }
}
