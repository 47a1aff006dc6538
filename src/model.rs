//! Core data models for Stroop Runner.
//! Colors, rules, power-ups and the obstacle rows that scroll down the track.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    Red,
    Blue,
    Green,
    Yellow,
    Gray,
    Brown,
    Purple,
    Pink,
    Black,
    White,
}

impl Color {
    pub const ALL: [Color; 10] = [
        Color::Red,
        Color::Blue,
        Color::Green,
        Color::Yellow,
        Color::Gray,
        Color::Brown,
        Color::Purple,
        Color::Pink,
        Color::Black,
        Color::White,
    ];

    /// Word printed on an item or in the HUD.
    pub fn name(self) -> &'static str {
        match self {
            Color::Red => "RED",
            Color::Blue => "BLUE",
            Color::Green => "GREEN",
            Color::Yellow => "YELLOW",
            Color::Gray => "GRAY",
            Color::Brown => "BROWN",
            Color::Purple => "PURPLE",
            Color::Pink => "PINK",
            Color::Black => "BLACK",
            Color::White => "WHITE",
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            Color::Red => "#ef4444",
            Color::Blue => "#3b82f6",
            Color::Green => "#22c55e",
            Color::Yellow => "#eab308",
            Color::Gray => "#6b7280",
            Color::Brown => "#92400e",
            Color::Purple => "#a855f7",
            Color::Pink => "#ec4899",
            Color::Black => "#020617",
            Color::White => "#ffffff",
        }
    }

    /// Thematic nouns shown instead of the color name while ALIAS is active.
    pub fn aliases(self) -> &'static [&'static str; 3] {
        match self {
            Color::Red => &["BLOOD", "TOMATO", "LIPS"],
            Color::Blue => &["SKY", "OCEAN", "JEANS"],
            Color::Green => &["LEAF", "GRASS", "FROG"],
            Color::Yellow => &["SUN", "LEMON", "BANANA"],
            Color::Gray => &["ASH", "SMOKE", "STEEL"],
            Color::Brown => &["WOOD", "COFFEE", "DIRT"],
            Color::Purple => &["GRAPE", "PLUM", "EGGPLANT"],
            Color::Pink => &["FLAMINGO", "GUM", "PIG"],
            Color::Black => &["NIGHT", "COAL", "INK"],
            Color::White => &["SNOW", "MILK", "CLOUD"],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    MatchColor,
    MatchWord,
}

impl RuleKind {
    pub fn other(self) -> RuleKind {
        match self {
            RuleKind::MatchColor => RuleKind::MatchWord,
            RuleKind::MatchWord => RuleKind::MatchColor,
        }
    }
}

/// The active objective: pick the lane whose color (or word) is `target`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub kind: RuleKind,
    pub target: Color,
}

impl Rule {
    pub fn is_satisfied_by(&self, display_color: Color, word: Color) -> bool {
        match self.kind {
            RuleKind::MatchColor => display_color == self.target,
            RuleKind::MatchWord => word == self.target,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerUp {
    Speed,
    Drunk,
    Fog,
    Dyslexia,
    Gps,
    Blocker,
    Wild,
    Glitch,
    Bleach,
    Alias,
    Warp,
}

impl PowerUp {
    pub const ALL: [PowerUp; 11] = [
        PowerUp::Speed,
        PowerUp::Drunk,
        PowerUp::Fog,
        PowerUp::Dyslexia,
        PowerUp::Gps,
        PowerUp::Blocker,
        PowerUp::Wild,
        PowerUp::Glitch,
        PowerUp::Bleach,
        PowerUp::Alias,
        PowerUp::Warp,
    ];

    /// Whether a crate carrying this power-up may appear under `kind`.
    /// GLITCH only makes sense for word rules, BLEACH/ALIAS for color rules.
    pub fn compatible_with(self, kind: RuleKind) -> bool {
        match self {
            PowerUp::Glitch => kind == RuleKind::MatchWord,
            PowerUp::Bleach | PowerUp::Alias => kind == RuleKind::MatchColor,
            _ => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObstacleItem {
    pub display_color: Color,
    pub word: Color,
    pub is_correct: bool,
    /// Set on crate items only.
    pub effect: Option<PowerUp>,
    /// Drives the hit animation in the presentation layer.
    pub is_hit: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Standard,
    Crate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleRow {
    pub id: u64,
    /// Vertical position in screen percent (0 = top, 100 = bottom).
    pub y: f64,
    /// One slot per lane; `None` is an empty lane.
    pub items: Vec<Option<ObstacleItem>>,
    pub passed: bool,
    pub rule: Rule,
    /// 1..=total_in_set for standard rows, 0 for crates.
    pub set_index: u32,
    pub total_in_set: u32,
    /// Height of the visual gap preceding the first row of a set.
    pub transition_zone_height: f64,
    pub kind: RowKind,
    pub is_guided: bool,
}

impl ObstacleRow {
    pub fn lane_count(&self) -> usize {
        self.items.len()
    }

    /// Lane of the correct item, if any.
    pub fn correct_lane(&self) -> Option<usize> {
        self.items
            .iter()
            .position(|slot| slot.is_some_and(|item| item.is_correct))
    }

    /// Last checkpoint of its objective set.
    pub fn completes_set(&self) -> bool {
        self.kind == RowKind::Standard && self.set_index == self.total_in_set
    }

    pub fn reset_hits(&mut self) {
        self.passed = false;
        for item in self.items.iter_mut().flatten() {
            item.is_hit = false;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextTone {
    Plain,
    Bonus,
    Effect(PowerUp),
    Warp,
    Surge,
}

/// Short-lived text popping up over a lane ("+3", "SAVED!", ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloatingText {
    pub id: u64,
    pub lane: usize,
    pub y: f64,
    pub text: String,
    pub tone: TextTone,
    pub expires_at_ms: f64,
}

/// Full-screen tint after a collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flash {
    Success,
    Saved,
    Crash,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_checks_only_its_attribute() {
        let color_rule = Rule { kind: RuleKind::MatchColor, target: Color::Red };
        assert!(color_rule.is_satisfied_by(Color::Red, Color::Blue));
        assert!(!color_rule.is_satisfied_by(Color::Blue, Color::Red));

        let word_rule = Rule { kind: RuleKind::MatchWord, target: Color::Red };
        assert!(word_rule.is_satisfied_by(Color::Blue, Color::Red));
        assert!(!word_rule.is_satisfied_by(Color::Red, Color::Blue));
    }

    #[test]
    fn power_up_rule_compatibility() {
        assert!(PowerUp::Glitch.compatible_with(RuleKind::MatchWord));
        assert!(!PowerUp::Glitch.compatible_with(RuleKind::MatchColor));
        assert!(PowerUp::Alias.compatible_with(RuleKind::MatchColor));
        assert!(!PowerUp::Bleach.compatible_with(RuleKind::MatchWord));
        assert!(PowerUp::Warp.compatible_with(RuleKind::MatchWord));
    }

    #[test]
    fn every_color_has_three_distinct_aliases() {
        for c in Color::ALL {
            let a = c.aliases();
            assert!(a[0] != a[1] && a[1] != a[2] && a[0] != a[2], "{:?}", c);
        }
    }
}
