//! Rule, item and row generation.
//!
//! Everything here is a pure function of its inputs and an injected RNG, so
//! the session can run seeded in tests and from entropy in the browser.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Color, ObstacleItem, ObstacleRow, PowerUp, RowKind, Rule, RuleKind};

/// Probability that a correct item's unchecked attribute conflicts with its checked one.
const CONFLICT_CHANCE: f64 = 0.7;
/// Probability that a distractor copies the target into the attribute the rule ignores.
const DECOY_CHANCE: f64 = 0.5;

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
    Color::ALL[rng.gen_range(0..Color::ALL.len())]
}

fn color_except<R: Rng + ?Sized>(rng: &mut R, excluded: Color) -> Color {
    let others: Vec<Color> = Color::ALL.iter().copied().filter(|&c| c != excluded).collect();
    others[rng.gen_range(0..others.len())]
}

/// Rolls a new objective. Without a forced kind the result never equals `previous`.
pub fn generate_rule<R: Rng + ?Sized>(
    rng: &mut R,
    previous: Option<&Rule>,
    forced: Option<RuleKind>,
) -> Rule {
    loop {
        let kind = forced.unwrap_or_else(|| {
            if rng.gen_bool(0.5) {
                RuleKind::MatchColor
            } else {
                RuleKind::MatchWord
            }
        });
        let rule = Rule { kind, target: random_color(rng) };
        match previous {
            Some(prev) if forced.is_none() && *prev == rule => continue,
            _ => return rule,
        }
    }
}

pub fn generate_item<R: Rng + ?Sized>(rng: &mut R, must_be_correct: bool, rule: &Rule) -> ObstacleItem {
    let target = rule.target;
    let (display_color, word) = if must_be_correct {
        let other = if rng.gen_bool(CONFLICT_CHANCE) {
            color_except(rng, target)
        } else {
            target
        };
        match rule.kind {
            RuleKind::MatchColor => (target, other),
            RuleKind::MatchWord => (other, target),
        }
    } else {
        let checked = color_except(rng, target);
        let unchecked = if rng.gen_bool(DECOY_CHANCE) {
            target
        } else {
            random_color(rng)
        };
        match rule.kind {
            RuleKind::MatchColor => (checked, unchecked),
            RuleKind::MatchWord => (unchecked, checked),
        }
    };
    ObstacleItem {
        display_color,
        word,
        is_correct: must_be_correct,
        effect: None,
        is_hit: false,
    }
}

/// One uniformly chosen correct lane, independent distractors elsewhere.
pub fn regenerate_row_items<R: Rng + ?Sized>(
    rng: &mut R,
    rule: &Rule,
    lane_count: usize,
) -> Vec<Option<ObstacleItem>> {
    if lane_count == 0 {
        return Vec::new();
    }
    let correct_lane = rng.gen_range(0..lane_count);
    (0..lane_count)
        .map(|lane| Some(generate_item(rng, lane == correct_lane, rule)))
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub fn generate_obstacle_row<R: Rng + ?Sized>(
    rng: &mut R,
    id: u64,
    rule: Rule,
    set_index: u32,
    transition_zone_height: f64,
    total_in_set: u32,
    lane_count: usize,
    spawn_y: f64,
) -> ObstacleRow {
    ObstacleRow {
        id,
        y: spawn_y,
        items: regenerate_row_items(rng, &rule, lane_count),
        passed: false,
        rule,
        set_index,
        total_in_set,
        transition_zone_height,
        kind: RowKind::Standard,
        is_guided: false,
    }
}

/// Power-ups a crate may carry under `kind`.
pub fn crate_pool(kind: RuleKind) -> Vec<PowerUp> {
    let mut pool = vec![
        PowerUp::Speed,
        PowerUp::Drunk,
        PowerUp::Fog,
        PowerUp::Dyslexia,
        PowerUp::Gps,
        PowerUp::Blocker,
        PowerUp::Wild,
        PowerUp::Warp,
    ];
    match kind {
        RuleKind::MatchWord => pool.push(PowerUp::Glitch),
        RuleKind::MatchColor => pool.extend([PowerUp::Bleach, PowerUp::Alias]),
    }
    pool
}

/// Builds a power-up row: one random safe lane, unique effects in the
/// others. Lanes stay empty once the filtered pool runs out.
pub fn generate_crate_row<R: Rng + ?Sized>(
    rng: &mut R,
    id: u64,
    rule: Rule,
    lane_count: usize,
    disabled: &[PowerUp],
    spawn_y: f64,
) -> ObstacleRow {
    let mut items: Vec<Option<ObstacleItem>> = vec![None; lane_count];

    let mut pool: Vec<PowerUp> = crate_pool(rule.kind)
        .into_iter()
        .filter(|p| !disabled.contains(p))
        .collect();

    if !pool.is_empty() && lane_count > 0 {
        let empty_lane = rng.gen_range(0..lane_count);
        pool.shuffle(rng);
        let mut effects = pool.into_iter();
        for (lane, slot) in items.iter_mut().enumerate() {
            if lane == empty_lane {
                continue;
            }
            let Some(effect) = effects.next() else { break };
            *slot = Some(ObstacleItem {
                display_color: Color::Gray,
                word: Color::Gray,
                is_correct: true,
                effect: Some(effect),
                is_hit: false,
            });
        }
    }

    ObstacleRow {
        id,
        y: spawn_y,
        items,
        passed: false,
        rule,
        set_index: 0,
        total_in_set: 0,
        transition_zone_height: 0.0,
        kind: RowKind::Crate,
        is_guided: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TRIALS: usize = 2_000;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0x5EED)
    }

    #[test]
    fn unforced_rule_never_repeats_previous() {
        let mut rng = rng();
        let prev = Rule { kind: RuleKind::MatchColor, target: Color::Red };
        for _ in 0..TRIALS {
            assert_ne!(generate_rule(&mut rng, Some(&prev), None), prev);
        }
    }

    #[test]
    fn forced_rule_keeps_kind() {
        let mut rng = rng();
        for _ in 0..TRIALS {
            let r = generate_rule(&mut rng, None, Some(RuleKind::MatchWord));
            assert_eq!(r.kind, RuleKind::MatchWord);
        }
    }

    #[test]
    fn correct_color_item_shows_target_color() {
        let mut rng = rng();
        let rule = Rule { kind: RuleKind::MatchColor, target: Color::Green };
        let mut conflicting = 0;
        for _ in 0..TRIALS {
            let item = generate_item(&mut rng, true, &rule);
            assert_eq!(item.display_color, Color::Green);
            assert!(item.is_correct);
            if item.word != Color::Green {
                conflicting += 1;
            }
        }
        // ~70% conflict rate
        let ratio = conflicting as f64 / TRIALS as f64;
        assert!((0.6..0.8).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn wrong_word_item_never_spells_target() {
        let mut rng = rng();
        let rule = Rule { kind: RuleKind::MatchWord, target: Color::Blue };
        let mut decoys = 0;
        for _ in 0..TRIALS {
            let item = generate_item(&mut rng, false, &rule);
            assert_ne!(item.word, Color::Blue);
            assert!(!rule.is_satisfied_by(item.display_color, item.word));
            if item.display_color == Color::Blue {
                decoys += 1;
            }
        }
        assert!(decoys > TRIALS / 3);
    }

    #[test]
    fn standard_rows_have_exactly_one_correct_lane() {
        let mut rng = rng();
        for i in 0..TRIALS {
            let rule = generate_rule(&mut rng, None, None);
            let lanes = 3 + i % 2;
            let row = generate_obstacle_row(&mut rng, i as u64, rule, 1, 0.0, 5, lanes, -20.0);
            assert_eq!(row.items.len(), lanes);
            let correct: Vec<_> = row.items.iter().flatten().filter(|it| it.is_correct).collect();
            assert_eq!(correct.len(), 1);
            let item = correct[0];
            assert!(rule.is_satisfied_by(item.display_color, item.word));
            assert_eq!(row.y, -20.0);
        }
    }

    #[test]
    fn crate_rows_have_one_safe_lane_and_unique_effects() {
        let mut rng = rng();
        for i in 0..TRIALS {
            let rule = generate_rule(&mut rng, None, None);
            let lanes = 3 + i % 2;
            let row = generate_crate_row(&mut rng, i as u64, rule, lanes, &[], -20.0);
            assert_eq!(row.kind, RowKind::Crate);
            assert_eq!((row.set_index, row.total_in_set), (0, 0));
            assert_eq!(row.items.iter().filter(|s| s.is_none()).count(), 1);
            let mut effects: Vec<PowerUp> = row.items.iter().flatten().filter_map(|it| it.effect).collect();
            for e in &effects {
                assert!(e.compatible_with(rule.kind), "{e:?} under {:?}", rule.kind);
            }
            effects.sort();
            effects.dedup();
            assert_eq!(effects.len(), lanes - 1);
        }
    }

    #[test]
    fn small_pool_leaves_surplus_lanes_empty() {
        let mut rng = rng();
        let rule = Rule { kind: RuleKind::MatchWord, target: Color::Pink };
        let disabled: Vec<PowerUp> = PowerUp::ALL.iter().copied().filter(|&p| p != PowerUp::Warp).collect();
        let row = generate_crate_row(&mut rng, 1, rule, 4, &disabled, -20.0);
        let filled: Vec<_> = row.items.iter().flatten().collect();
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].effect, Some(PowerUp::Warp));
    }

    #[test]
    fn empty_pool_yields_all_empty_row() {
        let mut rng = rng();
        let rule = Rule { kind: RuleKind::MatchColor, target: Color::Red };
        let row = generate_crate_row(&mut rng, 1, rule, 3, &PowerUp::ALL, -20.0);
        assert!(row.items.iter().all(Option::is_none));
        assert_eq!(row.items.len(), 3);
    }
}
