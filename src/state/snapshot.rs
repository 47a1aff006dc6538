//! Objective display and the per-frame view handed to the host.

use serde::Serialize;

use super::timers::{Clear, TimerEvent};
use super::warp::{Transition, WarpPhase};
use super::Session;
use crate::audio::{AudioCommand, Cue};
use crate::effects::{self, ActiveEffect};
use crate::model::{Flash, FloatingText, ObstacleRow, PowerUp, RowKind, Rule, RuleKind};

pub(crate) const PULSE_MS: f64 = 300.0;

/// Everything the presentation layer needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub rows: Vec<ObstacleRow>,
    pub player_lane: usize,
    pub lane_count: usize,
    pub score: u32,
    pub lives: u32,
    pub level: u32,
    pub hud_rule: Rule,
    pub progress: u32,
    pub total: u32,
    pub alias_word: Option<String>,
    pub active_effect: ActiveEffect,
    pub warp_phase: WarpPhase,
    /// "3", "2", "1", "GO!" after the power-up tutorial.
    pub countdown: Option<String>,
    /// Seconds left before the fourth lane opens.
    pub lane_warning: Option<u32>,
    pub level_announcement: Option<u32>,
    pub life_banner: bool,
    pub warp_banner: bool,
    pub intro_message: Option<String>,
    pub floating_texts: Vec<FloatingText>,
    pub flash: Option<Flash>,
    pub gps_lane: Option<usize>,
    pub guidance_lane: Option<usize>,
    pub show_tap_guidance: bool,
    pub tutorial: Option<PowerUp>,
    pub pulse: bool,
    pub paused: bool,
    pub settings_open: bool,
    pub over: bool,
    pub elapsed_ms: f64,
}

impl FrameSnapshot {
    pub fn is_reversed(&self) -> bool {
        self.warp_phase.is_reversed()
    }

    pub fn hud_word(&self) -> &str {
        self.alias_word.as_deref().unwrap_or(self.hud_rule.target.name())
    }
}

impl Session {
    /// Picks the objective the HUD should show and reacts when it changes.
    pub(crate) fn refresh_hud(&mut self) {
        let set_size = self.config.set_size;
        let spawn_y = self.config.spawn_y;
        let player_y = self.config.player_y;
        let (rule, progress, total) = match self.spin_rule {
            Some(rule) => (rule, 0, set_size),
            None => self
                .rows
                .iter()
                .find(|r| !r.passed && r.kind == RowKind::Standard && r.y > spawn_y && r.y < player_y)
                .map(|r| (r.rule, r.set_index.saturating_sub(1), r.total_in_set))
                .unwrap_or((self.current_rule, 0, set_size)),
        };
        self.hud_progress = progress;
        self.hud_total = total;

        if rule == self.hud_rule {
            return;
        }
        let kind_changed = rule.kind != self.hud_rule.kind;
        self.hud_rule = rule;
        self.pulse = true;
        self.timers.cancel(TimerEvent::Clear(Clear::Pulse));
        self.schedule_in(PULSE_MS, TimerEvent::Clear(Clear::Pulse));
        self.audio(AudioCommand::Play(Cue::Objective));
        if kind_changed {
            self.audio(AudioCommand::SetWordTheme(rule.kind == RuleKind::MatchWord));
        }
        if self.spin_rule.is_none() && self.effect.is_active(PowerUp::Alias) {
            self.alias_word = Some(effects::alias_word(&mut self.rng, rule.target));
        }
    }

    /// Correct lane of the lowest live checkpoint that satisfies `filter`.
    fn lowest_correct_lane(&self, max_y: f64, filter: impl Fn(&ObstacleRow) -> bool) -> Option<usize> {
        self.rows
            .iter()
            .filter(|r| !r.passed && r.y < max_y && filter(r))
            .max_by(|a, b| a.y.total_cmp(&b.y))
            .and_then(ObstacleRow::correct_lane)
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let band_end = self.config.player_y + self.config.hitbox;
        let spawn_y = self.config.spawn_y;
        let gps_lane = if self.effect.is_active(PowerUp::Gps) {
            self.lowest_correct_lane(band_end, |r| r.kind == RowKind::Standard && r.y > spawn_y)
        } else {
            None
        };
        let guidance_lane = self.lowest_correct_lane(band_end, |r| r.is_guided);
        let show_tap_guidance = guidance_lane.is_some_and(|lane| lane != self.player_lane)
            && self.effect.is_active(PowerUp::Dyslexia);
        let lane_warning = match self.transition {
            Transition::LaneCountdown { remaining, .. } => Some(remaining),
            _ => None,
        };

        FrameSnapshot {
            rows: self.rows.clone(),
            player_lane: self.player_lane,
            lane_count: self.lane_count,
            score: self.score,
            lives: self.lives,
            level: self.level,
            hud_rule: self.hud_rule,
            progress: self.hud_progress,
            total: self.hud_total,
            alias_word: self.alias_word.map(str::to_owned),
            active_effect: self.effect,
            warp_phase: self.warp,
            countdown: self.countdown.clone(),
            lane_warning,
            level_announcement: self.level_announcement,
            life_banner: self.life_banner,
            warp_banner: self.warp_banner,
            intro_message: self.intro_message.clone(),
            floating_texts: self.texts.clone(),
            flash: self.flash,
            gps_lane,
            guidance_lane,
            show_tap_guidance,
            tutorial: self.tutorial,
            pulse: self.pulse,
            paused: self.paused,
            settings_open: self.settings_open,
            over: self.over,
            elapsed_ms: self.clock_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, PracticeMode, Settings};
    use crate::model::Color;
    use crate::state::events::GameEvent;

    fn session() -> Session {
        let mut s = Session::with_seed(GameConfig::default(), PracticeMode::Off, 9);
        s.take_events(&Settings::default());
        s
    }

    #[test]
    fn hud_follows_the_upcoming_checkpoint() {
        let mut s = session();
        s.spawn_if_due(&Settings::default());
        s.rows[0].y = 40.0;
        s.rows[0].set_index = 3;
        let word_rule = Rule { kind: RuleKind::MatchWord, target: Color::Pink };
        s.rows[0].rule = word_rule;
        s.refresh_hud();
        assert_eq!(s.hud_rule, word_rule);
        assert_eq!(s.hud_progress, 2);
        assert!(s.pulse);
        let events = s.take_events(&Settings::default());
        assert!(events.contains(&GameEvent::Audio(AudioCommand::Play(Cue::Objective))));
        assert!(events.contains(&GameEvent::Audio(AudioCommand::SetWordTheme(true))));
    }

    #[test]
    fn unchanged_hud_stays_quiet() {
        let mut s = session();
        s.refresh_hud();
        assert!(s.take_events(&Settings::default()).is_empty());
        assert!(!s.pulse);
    }

    #[test]
    fn gps_points_at_the_lowest_live_checkpoint() {
        let mut s = session();
        s.spawn_if_due(&Settings::default());
        s.rows[0].y = 70.0;
        assert_eq!(s.snapshot().gps_lane, None);
        s.effect = ActiveEffect::Single(PowerUp::Gps);
        assert_eq!(s.snapshot().gps_lane, s.rows[0].correct_lane());
    }
}
