//! Hit detection, scoring, set completion and the level/warp transitions
//! they trigger.

use log::{debug, info};

use super::events::GameEvent;
use super::spawn::SpawnCursor;
use super::timers::{Clear, TimerEvent};
use super::warp::{Transition, WarpPhase};
use super::Session;
use crate::audio::{AudioCommand, Cue};
use crate::config::Settings;
use crate::effects::{self, ActiveEffect};
use crate::model::{Flash, PowerUp, RowKind, TextTone};

pub(crate) const WARP_PREP_MS: f64 = 1_000.0;
pub(crate) const WARP_BANNER_MS: f64 = 1_500.0;
pub(crate) const ANNOUNCEMENT_MS: f64 = 1_000.0;
pub(crate) const LIFE_BANNER_MS: f64 = 1_000.0;
pub(crate) const COUNTDOWN_STEP_MS: f64 = 1_000.0;
pub(crate) const FLASH_MS: f64 = 150.0;
const GUIDANCE_END_MS: f64 = 4_000.0;
const WARP_GUIDANCE_END_MS: f64 = 3_000.0;
const LEVEL_HAPTIC_MS: u32 = 200;
const CRASH_HAPTIC_MS: u32 = 800;
const GUIDANCE_ENDED: &str = "GUIDANCE ENDED: You're on your own!";

enum Outcome {
    /// Nothing under the player; the row keeps moving.
    PassThrough,
    Pickup(PowerUp),
    Success,
    Failure,
}

impl Session {
    /// Resolves every unpassed row against the player's lane. Stops early
    /// when a resolution clears the track or ends the run.
    pub(crate) fn detect_collisions(&mut self, settings: &Settings) {
        let player_y = self.config.player_y;
        let hitbox = self.config.hitbox;
        let reversed = self.warp.is_reversed();
        let mut i = 0;
        while i < self.rows.len() {
            if self.over {
                return;
            }
            let row = &self.rows[i];
            if row.passed {
                i += 1;
                continue;
            }
            if (row.y - player_y).abs() < hitbox {
                let outcome = match row.items.get(self.player_lane) {
                    None => Outcome::PassThrough,
                    Some(None) => Outcome::PassThrough,
                    Some(Some(item)) => match (row.kind, item.effect) {
                        (RowKind::Crate, Some(p)) => Outcome::Pickup(p),
                        (RowKind::Crate, None) => Outcome::PassThrough,
                        (RowKind::Standard, _) if item.is_correct => Outcome::Success,
                        (RowKind::Standard, _) => Outcome::Failure,
                    },
                };
                let rows_before = self.rows.len();
                match outcome {
                    Outcome::PassThrough => {}
                    Outcome::Pickup(p) => self.pickup(i, p, settings),
                    Outcome::Success => self.score_hit(i),
                    Outcome::Failure => self.miss(i),
                }
                if self.rows.len() != rows_before {
                    return;
                }
            } else if reversed {
                if row.y < player_y - hitbox {
                    self.rows[i].passed = true;
                }
            } else if row.y > player_y + hitbox {
                let completes = row.completes_set();
                self.rows[i].passed = true;
                if completes {
                    let rows_before = self.rows.len();
                    self.complete_set(i);
                    if self.rows.len() != rows_before {
                        return;
                    }
                }
            }
            i += 1;
        }
    }

    fn mark_hit(&mut self, index: usize) {
        let lane = self.player_lane;
        let row = &mut self.rows[index];
        row.passed = true;
        if let Some(Some(item)) = row.items.get_mut(lane) {
            item.is_hit = true;
        }
    }

    fn pickup(&mut self, index: usize, p: PowerUp, settings: &Settings) {
        self.mark_hit(index);
        if self.practice.practiced_power_up().is_some() && !self.tutorial_shown {
            self.tutorial_shown = true;
            self.tutorial = Some(p);
            self.sync_overlay_audio();
        }
        let lane = self.player_lane;
        match p {
            PowerUp::Warp => {
                if self.warp.is_active() {
                    return;
                }
                debug!("warp challenge started");
                self.warp = WarpPhase::Run1;
                self.effect = ActiveEffect::None;
                self.audio(AudioCommand::Play(Cue::Crate));
                self.add_text(lane, 80.0, effects::pickup_banner(p), TextTone::Warp);
            }
            PowerUp::Wild => {
                let disabled = settings.disabled_power_ups();
                self.effect = effects::sample_wild(&mut self.rng, self.hud_rule.kind, &disabled);
                if self.effect.is_active(PowerUp::Alias) {
                    self.start_alias_spin();
                }
                self.audio(AudioCommand::Play(Cue::Wild));
                self.add_text(lane, 80.0, effects::pickup_banner(p), TextTone::Plain);
                self.add_text(lane, 90.0, "DOUBLE EFFECT!", TextTone::Bonus);
            }
            _ => {
                self.effect = ActiveEffect::Single(p);
                self.audio(AudioCommand::Play(Cue::Crate));
                self.add_text(lane, 80.0, effects::pickup_banner(p), TextTone::Effect(p));
                if p == PowerUp::Alias {
                    self.start_alias_spin();
                }
            }
        }
    }

    fn score_hit(&mut self, index: usize) {
        self.mark_hit(index);
        let (set_index, total, completes) = {
            let row = &self.rows[index];
            (row.set_index, row.total_in_set, row.completes_set())
        };
        let reversed = self.warp.is_reversed();
        let (points, tone) = if reversed {
            self.audio(AudioCommand::Play(Cue::WarpRewind { set_index }));
            (self.config.warp_rewind_points + total.saturating_sub(set_index), TextTone::Warp)
        } else {
            let tone = match self.effect {
                ActiveEffect::None => TextTone::Plain,
                ActiveEffect::Single(p) => TextTone::Effect(p),
                ActiveEffect::Wild(..) => TextTone::Bonus,
            };
            (self.effect.points(), tone)
        };

        let old_score = self.score;
        self.score += points;
        let every = self.config.life_bonus_every.max(1);
        if self.score / every > old_score / every {
            self.lives += 1;
            self.life_banner = true;
            self.audio(AudioCommand::Play(Cue::LifeGained));
            self.timers.cancel(TimerEvent::Clear(Clear::LifeBanner));
            self.schedule_in(LIFE_BANNER_MS, TimerEvent::Clear(Clear::LifeBanner));
        }
        self.emit(GameEvent::ScoreChanged { score: self.score });
        let lane = self.player_lane;
        self.add_text(lane, 85.0, &format!("+{points}"), tone);
        self.show_flash(Flash::Success);

        if !reversed && completes {
            self.complete_set(index);
        }
        if reversed && set_index == 1 {
            self.close_loop();
        }
    }

    fn miss(&mut self, index: usize) {
        if self.lives > 0 {
            self.lives -= 1;
            self.rows[index].passed = true;
            self.audio(AudioCommand::Play(Cue::LifeLost));
            self.show_flash(Flash::Saved);
            let lane = self.player_lane;
            self.add_text(lane, 85.0, "SAVED!", TextTone::Plain);

            let (set_index, completes) = (self.rows[index].set_index, self.rows[index].completes_set());
            let reversed = self.warp.is_reversed();
            if !reversed && completes {
                self.complete_set(index);
            }
            if reversed && set_index == 1 {
                self.close_loop();
            }
            return;
        }

        info!("game over: score={} elapsed={:.0}ms", self.score, self.clock_ms);
        self.flash = Some(Flash::Crash);
        self.audio(AudioCommand::Play(Cue::Crash));
        self.emit(GameEvent::Haptic { millis: CRASH_HAPTIC_MS });
        self.warp = WarpPhase::None;
        self.audio(AudioCommand::SetReverse(false));
        self.audio(AudioCommand::StopMusic);
        self.emit(GameEvent::GameOver { score: self.score, elapsed_ms: self.clock_ms });
        self.over = true;
    }

    /// Bookkeeping after the last row of a set was hit, saved or passed.
    pub(crate) fn complete_set(&mut self, index: usize) {
        let (completes, guided) = {
            let row = &self.rows[index];
            (row.completes_set(), row.is_guided)
        };
        if !completes {
            return;
        }

        if self.warp == WarpPhase::Run1 {
            debug!("warp: preparing reverse");
            self.warp = WarpPhase::PrepReverse;
            self.warp_prep_started_ms = self.clock_ms;
            self.audio(AudioCommand::SetWarpTransition(true));
            self.audio(AudioCommand::RampToWarpSpeed { seconds: (WARP_PREP_MS / 1_000.0) as f32 });
            self.schedule_in(WARP_PREP_MS, TimerEvent::WarpReverse);
        }

        self.completed_sets += 1;
        if !self.warp.is_active() {
            self.check_level_up();
        }

        if self.completed_sets % self.config.sets_per_level.max(1) == 0 {
            let surged = self.config.initial_speed * (1.0 + 0.15 * self.level as f64);
            self.speed = surged.min(self.config.max_speed);
            debug!("velocity surge: speed={:.4}", self.speed);
            self.add_text(1, 60.0, "VELOCITY SURGE", TextTone::Surge);
            self.audio(AudioCommand::Play(Cue::Objective));
        }

        let warp_practice = self.practice.practiced_power_up() == Some(PowerUp::Warp);
        if !warp_practice && self.tutorial_crate_spawned && guided {
            self.guided_sets_completed += 1;
            if self.guided_sets_completed == 3 {
                self.show_intro(GUIDANCE_ENDED, GUIDANCE_END_MS);
            }
        }

        self.effect = ActiveEffect::None;
        self.spin_rule = None;
        self.alias_word = None;
        self.texts.clear();
        self.timers.cancel_where(|e| matches!(e, TimerEvent::Clear(Clear::Text(_)) | TimerEvent::AliasSpin { .. }));
    }

    /// Applies a pending level-up unless a lane change is already running.
    pub(crate) fn check_level_up(&mut self) {
        if self.transition.blocks_level_up() {
            return;
        }
        let target = self.completed_sets / self.config.sets_per_level.max(1) + 1;
        if target <= self.level {
            return;
        }
        info!("level up: {} -> {}", self.level, target);

        if self.practice.pins_four_lanes() {
            self.level = target;
            self.announce_level(target);
            self.audio(AudioCommand::Play(Cue::LevelUp));
            return;
        }

        if target % 3 == 0 {
            self.transition = Transition::Announcing { level: target };
            self.level = target;
            self.announce_level(target);
            self.audio(AudioCommand::Play(Cue::LevelUp));
            self.schedule_in(ANNOUNCEMENT_MS, TimerEvent::BeginExpansion { level: target });
            return;
        }

        if self.level % 3 == 0 {
            debug!("lanes: contracting to {}", self.config.base_lanes);
            self.lane_count = self.config.base_lanes;
            self.player_lane = self.player_lane.min(self.lane_count - 1);
            self.reset_track();
        }
        self.level = target;
        self.announce_level(target);
        self.audio(AudioCommand::Play(Cue::LevelUp));
        self.emit(GameEvent::Haptic { millis: LEVEL_HAPTIC_MS });
    }

    /// Announcement over: clear the track and count down to the extra lane.
    pub(crate) fn begin_expansion(&mut self, level: u32) {
        self.level_announcement = None;
        self.reset_track();
        self.transition = Transition::LaneCountdown { level, remaining: 3 };
        self.audio(AudioCommand::Play(Cue::Objective));
        self.emit(GameEvent::Haptic { millis: LEVEL_HAPTIC_MS });
        self.schedule_in(COUNTDOWN_STEP_MS, TimerEvent::ExpansionTick);
    }

    pub(crate) fn expansion_tick(&mut self) {
        let Transition::LaneCountdown { level, remaining } = self.transition else { return };
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.transition = Transition::LaneCountdown { level, remaining };
            self.audio(AudioCommand::Play(Cue::Objective));
            self.schedule_in(COUNTDOWN_STEP_MS, TimerEvent::ExpansionTick);
        } else {
            debug!("lanes: expanded to {}", self.config.expanded_lanes);
            self.lane_count = self.config.expanded_lanes;
            self.level = level;
            self.transition = Transition::Idle;
        }
    }

    /// Slowdown over: every row becomes live again and scrolls back up.
    pub(crate) fn begin_warp_reverse(&mut self) {
        if self.warp != WarpPhase::PrepReverse {
            return;
        }
        debug!("warp: reversing");
        self.warp = WarpPhase::Run2;
        for row in &mut self.rows {
            row.reset_hits();
        }
        self.warp_banner = true;
        self.schedule_in(WARP_BANNER_MS, TimerEvent::Clear(Clear::WarpBanner));
        self.audio(AudioCommand::SetWarpTransition(false));
        self.audio(AudioCommand::SetReverse(true));
        self.audio(AudioCommand::Play(Cue::Spin));
    }

    /// Row 1 reached on the way back: the warp challenge is done.
    fn close_loop(&mut self) {
        debug!("warp: loop closed");
        self.warp = WarpPhase::None;
        self.audio(AudioCommand::SetReverse(false));
        self.audio(AudioCommand::Play(Cue::LevelUp));
        let lane = self.player_lane;
        self.add_text(lane, 70.0, "LOOP CLOSED", TextTone::Plain);
        self.reset_track();

        if self.practice.practiced_power_up() == Some(PowerUp::Warp) {
            self.warp_loops += 1;
            if self.warp_loops == 1 {
                self.show_intro(GUIDANCE_ENDED, WARP_GUIDANCE_END_MS);
            }
        }
        self.check_level_up();
    }

    /// Empties the track and primes the next spawn at a set boundary.
    pub(crate) fn reset_track(&mut self) {
        self.rows.clear();
        self.last_spawn_y = 100.0;
        self.cursor = SpawnCursor::InSet(self.config.set_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, PracticeMode};
    use crate::generator::generate_obstacle_row;
    use crate::model::{Color, Rule, RuleKind};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session() -> Session {
        let mut s = Session::with_seed(GameConfig::default(), PracticeMode::Off, 5);
        s.take_events(&Settings::default());
        s
    }

    fn place_row(s: &mut Session, set_index: u32, y: f64) -> usize {
        let rule = Rule { kind: RuleKind::MatchColor, target: Color::Red };
        let mut rng = StdRng::seed_from_u64(set_index as u64);
        let mut row = generate_obstacle_row(&mut rng, 1_000 + set_index as u64, rule, set_index, 0.0, 5, s.lane_count, y);
        row.y = y;
        s.rows.push(row);
        s.rows.len() - 1
    }

    #[test]
    fn life_gain_is_capped_at_one_per_hit() {
        let mut s = session();
        s.score = 48;
        s.effect = ActiveEffect::Wild(PowerUp::Gps, PowerUp::Speed);
        s.config.life_bonus_every = 2;
        let i = place_row(&mut s, 2, 85.0);
        s.player_lane = s.rows[i].correct_lane().expect("correct lane");
        s.detect_collisions(&Settings::default());
        assert_eq!(s.score, 52);
        assert_eq!(s.lives, 1);
    }

    #[test]
    fn saved_miss_spends_a_life() {
        let mut s = session();
        s.lives = 2;
        let i = place_row(&mut s, 3, 84.0);
        let correct = s.rows[i].correct_lane().expect("correct lane");
        s.player_lane = (correct + 1) % s.lane_count;
        s.detect_collisions(&Settings::default());
        assert_eq!(s.lives, 1);
        assert!(s.rows[i].passed);
        assert_eq!(s.flash, Some(Flash::Saved));
        assert!(!s.over);
    }

    #[test]
    fn missing_a_whole_row_is_not_fatal() {
        let mut s = session();
        let i = place_row(&mut s, 5, 91.0);
        s.detect_collisions(&Settings::default());
        assert!(s.rows[i].passed);
        assert_eq!(s.completed_sets, 1);
        assert!(!s.over);
    }

    #[test]
    fn third_set_surges_speed() {
        let mut s = session();
        s.completed_sets = 2;
        let i = place_row(&mut s, 5, 95.0);
        s.detect_collisions(&Settings::default());
        let expected = (0.4025 * (1.0 + 0.15 * s.level as f64)).min(2.0);
        assert!((s.speed - expected).abs() < 1e-9);
        assert!(s.rows.get(i).is_none() || s.rows[i].passed);
    }

    fn expand_to(s: &mut Session, level: u32) {
        s.completed_sets = (level - 1) * 3;
        s.check_level_up();
        assert_eq!(s.transition, Transition::Announcing { level });
        assert_eq!(s.lane_count, 3);
        s.begin_expansion(level);
        for _ in 0..3 {
            s.expansion_tick();
        }
        assert_eq!(s.transition, Transition::Idle);
        assert_eq!((s.level, s.lane_count), (level, 4));
    }

    fn contract_to(s: &mut Session, level: u32) {
        s.player_lane = 3;
        s.completed_sets = (level - 1) * 3;
        s.check_level_up();
        assert_eq!(s.transition, Transition::Idle);
        assert_eq!((s.level, s.lane_count, s.player_lane), (level, 3, 2));
    }

    #[test]
    fn every_third_level_alternates_lane_expansion() {
        let mut s = session();
        s.level = 5;
        expand_to(&mut s, 6);
        contract_to(&mut s, 7);

        s.level = 8;
        expand_to(&mut s, 9);
        contract_to(&mut s, 10);
    }

    #[test]
    fn warp_pickup_while_warping_is_ignored() {
        let mut s = session();
        s.warp = WarpPhase::Run2;
        s.effect = ActiveEffect::Single(PowerUp::Fog);
        let i = place_row(&mut s, 2, 85.0);
        s.pickup(i, PowerUp::Warp, &Settings::default());
        assert_eq!(s.warp, WarpPhase::Run2);
        assert_eq!(s.effect, ActiveEffect::Single(PowerUp::Fog));
    }
}
