//! Power-up catalog and the effect currently applied to the run.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::model::{Color, PowerUp, RuleKind};

/// Points for a checkpoint hit with nothing active.
pub const BASE_POINTS: u32 = 1;

pub struct PowerUpInfo {
    pub label: &'static str,
    pub description: &'static str,
    pub score: u32,
    /// Tutorial card lines shown on the first pickup in single-crate practice.
    pub tutorial: [&'static str; 3],
}

pub fn info(p: PowerUp) -> PowerUpInfo {
    match p {
        PowerUp::Wild => PowerUpInfo {
            label: "WILD",
            description: "Activates 2 random effects simultaneously. Stacks score rewards.",
            score: 10,
            tutorial: [
                "Grants TWO random effects at once.",
                "Score multipliers stack.",
                "Prepare for immediate chaos!",
            ],
        },
        PowerUp::Warp => PowerUpInfo {
            label: "WARP",
            description: "Initiates a time-loop challenge. Complete the track forward, then survive the REVERSE.",
            score: 5,
            tutorial: [
                "Complete the forward track segment.",
                "The track will STOP and REVERSE.",
                "Navigate backward to close the loop!",
            ],
        },
        PowerUp::Dyslexia => PowerUpInfo {
            label: "SWAP",
            description: "Reverses your Left and Right steering controls.",
            score: 5,
            tutorial: [
                "Your steering is REVERSED.",
                "Tap LEFT to go RIGHT.",
                "Tap RIGHT to go LEFT.",
            ],
        },
        PowerUp::Glitch => PowerUpInfo {
            label: "GLITCH",
            description: "Corrupts and scrambles text on checkpoints. (Word Mode only)",
            score: 4,
            tutorial: [
                "Checkpoint text becomes corrupted.",
                "Read carefully through the static.",
                "Identify the hidden word logic.",
            ],
        },
        PowerUp::Speed => PowerUpInfo {
            label: "SPEED",
            description: "Temporarily increases game speed significantly.",
            score: 3,
            tutorial: [
                "Velocity increases drastically.",
                "Reflexes must be sharp.",
                "Survive the surge for bonus points.",
            ],
        },
        PowerUp::Blocker => PowerUpInfo {
            label: "BLOCK",
            description: "Spawns construction barriers that block random lanes.",
            score: 3,
            tutorial: [
                "Construction barriers appear.",
                "One lane becomes impassable.",
                "Quickly switch to open lanes.",
            ],
        },
        PowerUp::Bleach => PowerUpInfo {
            label: "BLEACH",
            description: "Washes out colors with a strong white overlay. (Color Mode only)",
            score: 3,
            tutorial: [
                "Colors are washed out.",
                "Distinguish faint hues.",
                "Don't let the brightness fool you.",
            ],
        },
        PowerUp::Alias => PowerUpInfo {
            label: "ALIAS",
            description: "Replaces color names with object names (e.g., Red -> Blood). (Color Mode only)",
            score: 3,
            tutorial: [
                "Color names are replaced by objects.",
                "Example: 'BLOOD' means RED.",
                "Match the object's color!",
            ],
        },
        PowerUp::Drunk => PowerUpInfo {
            label: "DRUNK",
            description: "Distorts vision and causes the screen to sway unpredictably.",
            score: 2,
            tutorial: [
                "Vision becomes distorted.",
                "The screen sways and blurs.",
                "Maintain focus despite the dizziness.",
            ],
        },
        PowerUp::Fog => PowerUpInfo {
            label: "STORM",
            description: "Obscures the track with heavy rain and fog layers.",
            score: 2,
            tutorial: [
                "Visibility drops near zero.",
                "Heavy rain obscures upcoming items.",
                "Look closely for shapes in the fog.",
            ],
        },
        PowerUp::Gps => PowerUpInfo {
            label: "GPS",
            description: "Highlights the correct lane for upcoming checkpoints.",
            score: 1,
            tutorial: [
                "The correct lane is highlighted.",
                "Follow the navigation markers.",
                "Easy points, but stay alert!",
            ],
        },
    }
}

/// Banner shown over the player lane when a crate is collected.
pub fn pickup_banner(p: PowerUp) -> &'static str {
    match p {
        PowerUp::Speed => "SPEED UP!",
        PowerUp::Drunk => "DRUNK MODE!",
        PowerUp::Fog => "STORM MODE!",
        PowerUp::Dyslexia => "INPUT SWAP!",
        PowerUp::Gps => "GPS ACTIVE!",
        PowerUp::Blocker => "VISION BLOCKED!",
        PowerUp::Glitch => "TEXT CORRUPT!",
        PowerUp::Bleach => "COLOR WASH!",
        PowerUp::Alias => "ALIAS MODE!",
        PowerUp::Wild => "WILD MODE!",
        PowerUp::Warp => "WARP INITIATED",
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveEffect {
    #[default]
    None,
    Single(PowerUp),
    /// WILD composes two sampled sub-effects.
    Wild(PowerUp, PowerUp),
}

impl ActiveEffect {
    pub fn is_active(self, p: PowerUp) -> bool {
        match self {
            ActiveEffect::None => false,
            ActiveEffect::Single(q) => q == p,
            ActiveEffect::Wild(a, b) => p == PowerUp::Wild || a == p || b == p,
        }
    }

    /// Points a checkpoint hit is worth while this effect is active.
    pub fn points(self) -> u32 {
        match self {
            ActiveEffect::None => BASE_POINTS,
            ActiveEffect::Single(p) => info(p).score,
            ActiveEffect::Wild(a, b) => info(a).score + info(b).score,
        }
    }

    pub fn speed_multiplier(self, boost: f64) -> f64 {
        if self.is_active(PowerUp::Speed) { boost } else { 1.0 }
    }

    pub fn inverts_controls(self) -> bool {
        self.is_active(PowerUp::Dyslexia)
    }
}

/// Sub-effects WILD may draw from under `kind`.
pub fn wild_pool(kind: RuleKind) -> Vec<PowerUp> {
    let mut pool = vec![
        PowerUp::Speed,
        PowerUp::Drunk,
        PowerUp::Fog,
        PowerUp::Dyslexia,
        PowerUp::Gps,
        PowerUp::Blocker,
    ];
    match kind {
        RuleKind::MatchWord => pool.push(PowerUp::Glitch),
        RuleKind::MatchColor => pool.extend([PowerUp::Bleach, PowerUp::Alias]),
    }
    pool
}

/// Two distinct sub-effects. Disabled effects are skipped unless that
/// leaves fewer than two candidates.
pub fn sample_wild<R: Rng + ?Sized>(rng: &mut R, kind: RuleKind, disabled: &[PowerUp]) -> ActiveEffect {
    let full = wild_pool(kind);
    let filtered: Vec<PowerUp> = full.iter().copied().filter(|p| !disabled.contains(p)).collect();
    let mut pool = if filtered.len() >= 2 { filtered } else { full };
    pool.shuffle(rng);
    ActiveEffect::Wild(pool[0], pool[1])
}

pub fn alias_word<R: Rng + ?Sized>(rng: &mut R, color: Color) -> &'static str {
    let aliases = color.aliases();
    aliases[rng.gen_range(0..aliases.len())]
}

fn seeded_unit(seed: f64) -> f64 {
    let x = seed.sin() * 10_000.0;
    x - x.floor()
}

fn leet(c: char) -> Option<char> {
    Some(match c {
        'A' => '4',
        'B' => '8',
        'E' => '3',
        'G' => '6',
        'I' => '1',
        'O' => '0',
        'S' => '5',
        'T' => '7',
        'Z' => '2',
        _ => return None,
    })
}

/// Corrupted rendering of a checkpoint word. Stable for a given seed so a
/// row does not flicker between frames.
pub fn glitch_text(text: &str, seed: u64) -> String {
    let seed = seed as f64;
    let mut chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len > 3 {
        let omitted = if seeded_unit(seed) > 0.5 { 2 } else { 1 };
        let start = (seeded_unit(seed + 1.0) * (len - 2) as f64).floor() as usize + 1;
        let count = omitted.min(len - start - 1);
        chars.drain(start..start + count);
    }
    chars
        .into_iter()
        .enumerate()
        .map(|(i, c)| match leet(c) {
            Some(sub) if seeded_unit(seed + i as f64 + 10.0) < 0.6 => sub,
            _ => c,
        })
        .collect()
}

/// Seed for a checkpoint item's glitched word.
pub fn glitch_seed(row_id: u64, lane: usize) -> u64 {
    row_id + lane as u64 * 10
}

/// BLOCKER puts a barrier on lanes where this holds.
pub fn is_blocked(row_id: u64, lane: usize, lane_count: usize) -> bool {
    lane_count > 0 && (row_id + lane as u64) % lane_count as u64 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn wild_scores_the_sum_of_its_pair() {
        let e = ActiveEffect::Wild(PowerUp::Dyslexia, PowerUp::Gps);
        assert_eq!(e.points(), 6);
        assert!(e.is_active(PowerUp::Wild));
        assert!(e.is_active(PowerUp::Dyslexia));
        assert!(!e.is_active(PowerUp::Speed));
        assert_eq!(ActiveEffect::None.points(), 1);
        assert_eq!(ActiveEffect::Single(PowerUp::Glitch).points(), 4);
    }

    #[test]
    fn wild_sample_is_distinct_and_respects_disabled() {
        let mut rng = StdRng::seed_from_u64(7);
        let disabled = [PowerUp::Speed, PowerUp::Drunk, PowerUp::Fog, PowerUp::Dyslexia];
        for _ in 0..500 {
            let ActiveEffect::Wild(a, b) = sample_wild(&mut rng, RuleKind::MatchWord, &disabled) else {
                panic!("not a wild pair");
            };
            assert_ne!(a, b);
            assert!(!disabled.contains(&a) && !disabled.contains(&b));
            assert!(a.compatible_with(RuleKind::MatchWord) && b.compatible_with(RuleKind::MatchWord));
        }
    }

    #[test]
    fn wild_falls_back_to_full_pool() {
        let mut rng = StdRng::seed_from_u64(9);
        let disabled: Vec<PowerUp> = PowerUp::ALL.iter().copied().filter(|&p| p != PowerUp::Gps).collect();
        let ActiveEffect::Wild(a, b) = sample_wild(&mut rng, RuleKind::MatchColor, &disabled) else {
            panic!("not a wild pair");
        };
        assert_ne!(a, b);
        let pool = wild_pool(RuleKind::MatchColor);
        assert!(pool.contains(&a) && pool.contains(&b));
    }

    #[test]
    fn glitch_text_is_deterministic() {
        let a = glitch_text("PURPLE", 42);
        assert_eq!(a, glitch_text("PURPLE", 42));
        assert!(a.len() < "PURPLE".len());
        // Short words keep their length.
        assert_eq!(glitch_text("RED", 3).chars().count(), 3);
    }

    #[test]
    fn blocker_lane_follows_row_id() {
        assert!(is_blocked(3, 0, 3));
        assert!(is_blocked(4, 2, 3));
        assert!(!is_blocked(4, 0, 3));
    }
}
