//! Row spawning: objective sets, crate rows and practice guidance.

use log::debug;
use rand::Rng;

use super::Session;
use crate::config::Settings;
use crate::generator::{generate_crate_row, generate_obstacle_row, generate_rule};
use crate::model::{ObstacleRow, PowerUp, RowKind, RuleKind};

/// Gap after the single-crate practice opener.
const TUTORIAL_CRATE_GAP: f64 = 150.0;
/// Gap after the last row of a set, per unit of effective speed.
const SET_END_GAP_FACTOR: f64 = 60.0;
const CRATE_GAP_FACTOR: f64 = 30.0;
/// Every third set gets a long breather before it.
const BREATHER_BASE: f64 = 120.0;
const BREATHER_SPEED_FACTOR: f64 = 100.0;
/// Guided sets in single-crate practice.
const GUIDED_SETS: u32 = 3;

/// Where the next spawn falls in the objective cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnCursor {
    /// `n` rows of the current set are out; at `set_size` the set boundary is next.
    InSet(u32),
    /// A crate row was spawned; the next row starts a new set.
    AwaitingSet,
}

impl Session {
    pub(crate) fn spawn_if_due(&mut self, settings: &Settings) {
        if !self.transition.is_idle() || !self.warp.allows_spawn() {
            return;
        }
        if self.last_spawn_y <= self.config.spawn_y + self.next_spawn_distance {
            return;
        }
        self.spawn_next(settings);
    }

    fn next_row_id(&mut self) -> u64 {
        let id = self.next_row_id;
        self.next_row_id += 1;
        id
    }

    fn standard_row(&mut self, set_index: u32, transition_zone_height: f64) -> ObstacleRow {
        let id = self.next_row_id();
        generate_obstacle_row(
            &mut self.rng,
            id,
            self.current_rule,
            set_index,
            transition_zone_height,
            self.config.set_size,
            self.lane_count,
            self.config.spawn_y,
        )
    }

    fn push_rule_history(&mut self, kind: RuleKind) {
        self.rule_history.push(kind);
        if self.rule_history.len() > 2 {
            self.rule_history.remove(0);
        }
    }

    /// Two objectives of the same kind in a row force the other kind.
    fn history_forced_kind(&self) -> Option<RuleKind> {
        match self.rule_history.as_slice() {
            [a, b] if a == b => Some(a.other()),
            _ => None,
        }
    }

    fn guidance_applies(&self) -> bool {
        self.practice.practiced_power_up().is_some() && self.tutorial_crate_spawned
    }

    fn should_guide(&self) -> bool {
        if !self.guidance_applies() {
            return false;
        }
        match self.practice.practiced_power_up() {
            Some(PowerUp::Warp) => self.warp_loops < 1,
            _ => self.guided_sets_spawned <= GUIDED_SETS,
        }
    }

    fn crate_disabled_list(&self, settings: &Settings) -> Vec<PowerUp> {
        match self.practice.practiced_power_up() {
            Some(p) => PowerUp::ALL.iter().copied().filter(|&q| q != p).collect(),
            None => settings.disabled_power_ups(),
        }
    }

    fn spawn_next(&mut self, settings: &Settings) {
        let spawn_y = self.config.spawn_y;
        let set_size = self.config.set_size;
        let effective = self.effective_speed();
        let mut gap = self
            .rng
            .gen_range(self.config.min_spawn_distance..self.config.max_spawn_distance);

        let mut row = if self.practice.practiced_power_up().is_some() && !self.tutorial_crate_spawned {
            let id = self.next_row_id();
            let disabled = self.crate_disabled_list(settings);
            let row = generate_crate_row(&mut self.rng, id, self.current_rule, self.lane_count, &disabled, spawn_y);
            self.tutorial_crate_spawned = true;
            self.cursor = SpawnCursor::AwaitingSet;
            gap = TUTORIAL_CRATE_GAP;
            row
        } else {
            match self.cursor {
                SpawnCursor::InSet(n) if n >= set_size => {
                    self.objectives_spawned += 1;
                    if self.practice.skips_crates() {
                        let next = generate_rule(&mut self.rng, Some(&self.current_rule), self.practice.forced_rule_kind());
                        self.current_rule = next;
                        self.push_rule_history(next.kind);
                        self.cursor = SpawnCursor::InSet(1);
                        gap += effective * SET_END_GAP_FACTOR;
                        self.standard_row(1, self.last_spawn_y - spawn_y)
                    } else {
                        let forced = self.practice.forced_rule_kind().or_else(|| self.history_forced_kind());
                        let next = generate_rule(&mut self.rng, Some(&self.current_rule), forced);
                        let disabled = self.crate_disabled_list(settings);
                        let id = self.next_row_id();
                        let row = generate_crate_row(&mut self.rng, id, next, self.lane_count, &disabled, spawn_y);
                        self.current_rule = next;
                        self.push_rule_history(next.kind);
                        self.cursor = SpawnCursor::AwaitingSet;
                        gap += effective * CRATE_GAP_FACTOR;
                        row
                    }
                }
                SpawnCursor::AwaitingSet => {
                    if self.guidance_applies() {
                        self.guided_sets_spawned += 1;
                    }
                    self.cursor = SpawnCursor::InSet(1);
                    self.standard_row(1, self.last_spawn_y - spawn_y)
                }
                SpawnCursor::InSet(n) => {
                    let index = n + 1;
                    self.cursor = SpawnCursor::InSet(index);
                    if index == set_size {
                        let next_set = self.objectives_spawned + 1;
                        if !self.practice.is_practice() && next_set % 3 == 0 {
                            gap = BREATHER_BASE + self.speed * BREATHER_SPEED_FACTOR;
                        } else {
                            gap += effective * SET_END_GAP_FACTOR;
                        }
                    }
                    self.standard_row(index, 0.0)
                }
            }
        };

        if row.kind == RowKind::Standard && self.should_guide() {
            row.is_guided = true;
        }
        debug!(
            "spawn row {} {:?} set_index={} lanes={} gap={:.1}",
            row.id,
            row.kind,
            row.set_index,
            row.lane_count(),
            gap
        );
        self.rows.push(row);
        self.last_spawn_y = spawn_y;
        self.next_spawn_distance = gap;
    }
}
