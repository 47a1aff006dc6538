//! Game balance, practice modes and persisted user settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{PowerUp, RuleKind};

/// Fewest power-ups a player may leave enabled.
pub const MIN_ENABLED_POWER_UPS: usize = 3;

/// Balance constants. Distances and positions are in screen percent,
/// speeds in screen percent per nominal frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub initial_speed: f64,
    pub max_speed: f64,
    pub set_size: u32,
    pub min_spawn_distance: f64,
    pub max_spawn_distance: f64,
    pub player_y: f64,
    pub hitbox: f64,
    pub spawn_y: f64,
    pub despawn_bottom_y: f64,
    pub despawn_top_y: f64,
    pub nominal_frame_ms: f64,
    pub max_time_scale: f64,
    pub speed_boost: f64,
    pub reverse_speed_factor: f64,
    pub life_bonus_every: u32,
    pub sets_per_level: u32,
    pub base_lanes: usize,
    pub expanded_lanes: usize,
    pub starting_lives: u32,
    pub warp_rewind_points: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_speed: 0.4025,
            max_speed: 2.0,
            set_size: 5,
            min_spawn_distance: 25.0,
            max_spawn_distance: 60.0,
            player_y: 85.0,
            hitbox: 5.0,
            spawn_y: -20.0,
            despawn_bottom_y: 120.0,
            despawn_top_y: -30.0,
            nominal_frame_ms: 16.67,
            max_time_scale: 4.0,
            speed_boost: 1.5,
            reverse_speed_factor: 0.5,
            life_bonus_every: 50,
            sets_per_level: 3,
            base_lanes: 3,
            expanded_lanes: 4,
            starting_lives: 0,
            warp_rewind_points: 6,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PracticeMode {
    /// Regular scored run.
    #[default]
    Off,
    /// Track pinned to four lanes.
    FourLanes,
    ColorOnly,
    WordOnly,
    /// Opens with a crate of the given power-up and guides the first sets.
    SingleCrate(PowerUp),
}

impl PracticeMode {
    pub fn is_practice(self) -> bool {
        self != PracticeMode::Off
    }

    pub fn pins_four_lanes(self) -> bool {
        self == PracticeMode::FourLanes
    }

    /// Objective sets follow each other without crate rows.
    pub fn skips_crates(self) -> bool {
        matches!(self, PracticeMode::ColorOnly | PracticeMode::WordOnly)
    }

    pub fn practiced_power_up(self) -> Option<PowerUp> {
        match self {
            PracticeMode::SingleCrate(p) => Some(p),
            _ => None,
        }
    }

    /// Rule kind every objective must use, if the mode imposes one.
    pub fn forced_rule_kind(self) -> Option<RuleKind> {
        match self {
            PracticeMode::ColorOnly => Some(RuleKind::MatchColor),
            PracticeMode::WordOnly => Some(RuleKind::MatchWord),
            PracticeMode::SingleCrate(PowerUp::Glitch) => Some(RuleKind::MatchWord),
            PracticeMode::SingleCrate(PowerUp::Bleach | PowerUp::Alias) => {
                Some(RuleKind::MatchColor)
            }
            _ => None,
        }
    }

    pub fn initial_rule_kind(self) -> RuleKind {
        self.forced_rule_kind().unwrap_or(RuleKind::MatchColor)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("at least {min} power-ups must stay enabled")]
    TooFewPowerUps { min: usize },
    #[error("volume {value} out of range [0, 1]")]
    VolumeOutOfRange { value: f32 },
    #[error("invalid settings record: {0}")]
    Parse(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolumeChannel {
    Master,
    Music,
    Effects,
}

fn all_enabled() -> BTreeMap<PowerUp, bool> {
    PowerUp::ALL.iter().map(|&p| (p, true)).collect()
}

/// User settings, stored by the host as a flat JSON record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub master_volume: f32,
    pub music_volume: f32,
    pub sfx_volume: f32,
    pub visual_fx: bool,
    pub haptics: bool,
    pub power_ups: BTreeMap<PowerUp, bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            master_volume: 0.4,
            music_volume: 0.35,
            sfx_volume: 1.0,
            visual_fx: true,
            haptics: true,
            power_ups: all_enabled(),
        }
    }
}

impl Settings {
    /// Parses a stored record. Power-ups missing from the record stay enabled.
    /// A record the settings screen could not have produced is rejected.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let mut parsed: Settings =
            serde_json::from_str(raw).map_err(|e| SettingsError::Parse(e.to_string()))?;
        for p in PowerUp::ALL {
            parsed.power_ups.entry(p).or_insert(true);
        }
        for value in [parsed.master_volume, parsed.music_volume, parsed.sfx_volume] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::VolumeOutOfRange { value });
            }
        }
        if parsed.enabled_count() < MIN_ENABLED_POWER_UPS {
            return Err(SettingsError::TooFewPowerUps { min: MIN_ENABLED_POWER_UPS });
        }
        Ok(parsed)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        serde_json::to_string(self).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    pub fn is_enabled(&self, p: PowerUp) -> bool {
        self.power_ups.get(&p).copied().unwrap_or(true)
    }

    pub fn enabled_count(&self) -> usize {
        PowerUp::ALL.iter().filter(|&&p| self.is_enabled(p)).count()
    }

    pub fn disabled_power_ups(&self) -> Vec<PowerUp> {
        PowerUp::ALL
            .iter()
            .copied()
            .filter(|&p| !self.is_enabled(p))
            .collect()
    }

    /// Flips one power-up. Turning one off is refused at the floor.
    pub fn toggle_power_up(&mut self, p: PowerUp) -> Result<bool, SettingsError> {
        let enabled = self.is_enabled(p);
        if enabled && self.enabled_count() <= MIN_ENABLED_POWER_UPS {
            return Err(SettingsError::TooFewPowerUps {
                min: MIN_ENABLED_POWER_UPS,
            });
        }
        self.power_ups.insert(p, !enabled);
        Ok(!enabled)
    }

    pub fn set_volume(&mut self, channel: VolumeChannel, value: f32) -> Result<(), SettingsError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(SettingsError::VolumeOutOfRange { value });
        }
        match channel {
            VolumeChannel::Master => self.master_volume = value,
            VolumeChannel::Music => self.music_volume = value,
            VolumeChannel::Effects => self.sfx_volume = value,
        }
        Ok(())
    }
}
