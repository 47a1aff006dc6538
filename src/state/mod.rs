//! The session engine: one struct owning every piece of mutable game state,
//! advanced frame by frame by the host.

pub mod collision;
pub mod events;
pub mod snapshot;
pub mod spawn;
pub mod timers;
pub mod warp;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio::{AudioCommand, Cue};
use crate::config::{GameConfig, PracticeMode, Settings};
use crate::effects::{self, ActiveEffect};
use crate::generator::{generate_rule, regenerate_row_items};
use crate::model::{Color, Flash, FloatingText, ObstacleRow, PowerUp, RowKind, Rule, RuleKind, TextTone};

pub use events::GameEvent;
pub use snapshot::FrameSnapshot;
pub use spawn::SpawnCursor;
pub use warp::{Transition, WarpPhase};

use collision::{ANNOUNCEMENT_MS, COUNTDOWN_STEP_MS, FLASH_MS};
use timers::{Clear, TimerEvent, Timers};

const FLOATING_TEXT_MS: f64 = 1_000.0;
const PRACTICE_INTRO_MS: f64 = 3_000.0;
const GO_MS: f64 = 800.0;
const ALIAS_SPIN_STEP_MS: f64 = 150.0;
const PAUSE_HAPTIC_MS: u32 = 50;
/// Spawn accumulator value that forces an immediate spawn.
const PRIMED_SPAWN_Y: f64 = 100.0;
/// Extra accumulator after the tutorial countdown.
const POST_TUTORIAL_PRIME: f64 = 200.0;

pub struct Session {
    pub(crate) config: GameConfig,
    pub(crate) practice: PracticeMode,
    pub(crate) rng: StdRng,
    pub(crate) clock_ms: f64,
    pub(crate) timers: Timers,
    outbox: Vec<GameEvent>,

    // track
    pub(crate) rows: Vec<ObstacleRow>,
    pub(crate) next_row_id: u64,
    pub(crate) last_spawn_y: f64,
    pub(crate) next_spawn_distance: f64,
    pub(crate) cursor: SpawnCursor,
    pub(crate) current_rule: Rule,
    pub(crate) rule_history: Vec<RuleKind>,
    pub(crate) speed: f64,
    pub(crate) lane_count: usize,
    pub(crate) player_lane: usize,

    // progress
    pub(crate) score: u32,
    pub(crate) lives: u32,
    pub(crate) level: u32,
    pub(crate) completed_sets: u32,
    pub(crate) objectives_spawned: u32,

    pub(crate) effect: ActiveEffect,
    pub(crate) warp: WarpPhase,
    pub(crate) transition: Transition,
    pub(crate) warp_prep_started_ms: f64,

    // HUD
    pub(crate) hud_rule: Rule,
    pub(crate) hud_progress: u32,
    pub(crate) hud_total: u32,
    pub(crate) spin_rule: Option<Rule>,
    pub(crate) alias_word: Option<&'static str>,
    pub(crate) pulse: bool,

    // transient display
    pub(crate) countdown: Option<String>,
    pub(crate) level_announcement: Option<u32>,
    pub(crate) life_banner: bool,
    pub(crate) warp_banner: bool,
    pub(crate) intro_message: Option<String>,
    pub(crate) texts: Vec<FloatingText>,
    pub(crate) next_text_id: u64,
    pub(crate) flash: Option<Flash>,

    // overlays
    pub(crate) paused: bool,
    pub(crate) settings_open: bool,
    pub(crate) tutorial: Option<PowerUp>,

    // practice
    pub(crate) tutorial_crate_spawned: bool,
    pub(crate) tutorial_shown: bool,
    pub(crate) guided_sets_spawned: u32,
    pub(crate) guided_sets_completed: u32,
    pub(crate) warp_loops: u32,

    pub(crate) over: bool,
}

impl Session {
    pub fn new(config: GameConfig, practice: PracticeMode) -> Self {
        Self::with_rng(config, practice, StdRng::from_entropy())
    }

    pub fn with_seed(config: GameConfig, practice: PracticeMode, seed: u64) -> Self {
        Self::with_rng(config, practice, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: GameConfig, practice: PracticeMode, mut rng: StdRng) -> Self {
        let initial_kind = practice.initial_rule_kind();
        let current_rule = generate_rule(&mut rng, None, Some(initial_kind));
        let next_spawn_distance = rng.gen_range(config.min_spawn_distance..config.max_spawn_distance);
        let lane_count = if practice.pins_four_lanes() { config.expanded_lanes } else { config.base_lanes };

        let mut session = Self {
            rng,
            clock_ms: 0.0,
            timers: Timers::default(),
            outbox: Vec::new(),
            rows: Vec::new(),
            next_row_id: 1,
            last_spawn_y: PRIMED_SPAWN_Y,
            next_spawn_distance,
            cursor: SpawnCursor::InSet(0),
            current_rule,
            rule_history: vec![initial_kind],
            speed: config.initial_speed,
            lane_count,
            player_lane: 1.min(lane_count.saturating_sub(1)),
            score: 0,
            lives: config.starting_lives,
            level: 1,
            completed_sets: 0,
            objectives_spawned: 0,
            effect: ActiveEffect::None,
            warp: WarpPhase::None,
            transition: Transition::Idle,
            warp_prep_started_ms: 0.0,
            hud_rule: current_rule,
            hud_progress: 0,
            hud_total: config.set_size,
            spin_rule: None,
            alias_word: None,
            pulse: false,
            countdown: None,
            level_announcement: None,
            life_banner: false,
            warp_banner: false,
            intro_message: None,
            texts: Vec::new(),
            next_text_id: 1,
            flash: None,
            paused: false,
            settings_open: false,
            tutorial: None,
            tutorial_crate_spawned: false,
            tutorial_shown: false,
            guided_sets_spawned: 0,
            guided_sets_completed: 0,
            warp_loops: 0,
            over: false,
            config,
            practice,
        };

        info!("session start: practice={:?} lanes={}", practice, lane_count);
        session.audio(AudioCommand::Reset);
        session.audio(AudioCommand::StartMusic { restart: true });
        session.audio(AudioCommand::SetWordTheme(initial_kind == RuleKind::MatchWord));
        session.announce_level(1);
        if let Some(p) = practice.practiced_power_up() {
            let text = format!("PRACTICE: {} CRATE", effects::info(p).label);
            session.show_intro(&text, PRACTICE_INTRO_MS);
        }
        session
    }

    /// Advances the run by `dt_ms` and returns the events the frame produced.
    pub fn step(&mut self, dt_ms: f64, settings: &Settings) -> Vec<GameEvent> {
        if self.over || self.overlay_open() {
            return self.take_events(settings);
        }
        let dt_ms = dt_ms.max(0.0);
        self.clock_ms += dt_ms;
        while let Some(event) = self.timers.pop_due(self.clock_ms) {
            self.fire(event);
            if self.over {
                break;
            }
        }
        if self.over || self.transition.holds_track() {
            return self.take_events(settings);
        }

        let time_scale = (dt_ms / self.config.nominal_frame_ms).min(self.config.max_time_scale);
        let distance = self.effective_speed() * time_scale * self.warp_prep_scroll();
        let direction = self.warp.direction();
        for row in &mut self.rows {
            row.y += distance * direction;
        }

        if self.warp.allows_despawn() {
            if self.warp.is_reversed() {
                let top = self.config.despawn_top_y;
                self.rows.retain(|r| r.y > top);
            } else {
                let bottom = self.config.despawn_bottom_y;
                self.rows.retain(|r| r.y < bottom);
            }
        }

        if self.warp == WarpPhase::PrepReverse {
            // Rows coast to a stop; they are resolved again once reversed.
            return self.take_events(settings);
        }
        if !self.warp.is_reversed() {
            self.last_spawn_y += distance;
        }
        self.spawn_if_due(settings);
        self.refresh_hud();
        self.detect_collisions(settings);
        self.take_events(settings)
    }

    /// Drains queued events; haptics are dropped when the player disabled them.
    pub fn take_events(&mut self, settings: &Settings) -> Vec<GameEvent> {
        let mut events = std::mem::take(&mut self.outbox);
        if !settings.haptics {
            events.retain(|e| !matches!(e, GameEvent::Haptic { .. }));
        }
        events
    }

    /// Scroll factor for the warp slowdown: 1 when it starts, 0 at reversal.
    fn warp_prep_scroll(&self) -> f64 {
        if self.warp != WarpPhase::PrepReverse {
            return 1.0;
        }
        let elapsed = self.clock_ms - self.warp_prep_started_ms;
        (1.0 - elapsed / collision::WARP_PREP_MS).clamp(0.0, 1.0)
    }

    pub fn effective_speed(&self) -> f64 {
        let reverse = if self.warp.is_reversed() { self.config.reverse_speed_factor } else { 1.0 };
        self.speed * self.effect.speed_multiplier(self.config.speed_boost) * reverse
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn practice(&self) -> PracticeMode {
        self.practice
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn player_lane(&self) -> usize {
        self.player_lane
    }

    pub fn warp_phase(&self) -> WarpPhase {
        self.warp
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn active_effect(&self) -> ActiveEffect {
        self.effect
    }

    pub fn completed_sets(&self) -> u32 {
        self.completed_sets
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn rows(&self) -> &[ObstacleRow] {
        &self.rows
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.clock_ms
    }

    fn overlay_open(&self) -> bool {
        self.paused || self.settings_open || self.tutorial.is_some()
    }

    fn accepts_lane_input(&self) -> bool {
        !self.over && !self.overlay_open() && !self.transition.holds_track()
    }

    /// Moves to an absolute lane, mirrored while controls are inverted.
    pub fn select_lane(&mut self, lane: usize) {
        if !self.accepts_lane_input() {
            return;
        }
        let max = self.lane_count.saturating_sub(1);
        let lane = lane.min(max);
        self.player_lane = if self.effect.inverts_controls() { max - lane } else { lane };
    }

    /// Moves one lane left (`-1`) or right (`+1`), flipped while controls are inverted.
    pub fn shift_lane(&mut self, delta: i32) {
        if !self.accepts_lane_input() {
            return;
        }
        let delta = if self.effect.inverts_controls() { -delta } else { delta };
        let max = self.lane_count.saturating_sub(1) as i64;
        self.player_lane = (self.player_lane as i64 + delta as i64).clamp(0, max) as usize;
    }

    pub fn toggle_pause(&mut self) {
        if self.over {
            return;
        }
        self.paused = !self.paused;
        debug!("paused={}", self.paused);
        self.emit(GameEvent::Haptic { millis: PAUSE_HAPTIC_MS });
        self.sync_overlay_audio();
    }

    pub fn set_settings_open(&mut self, open: bool) {
        if self.settings_open == open {
            return;
        }
        self.settings_open = open;
        self.sync_overlay_audio();
    }

    /// Closes the power-up tutorial and counts down before the next set.
    pub fn dismiss_tutorial(&mut self) {
        if self.tutorial.take().is_none() {
            return;
        }
        self.transition = Transition::TutorialCountdown { remaining: 3 };
        self.countdown = Some("3".to_owned());
        self.timers.cancel(TimerEvent::Clear(Clear::Countdown));
        self.schedule_in(COUNTDOWN_STEP_MS, TimerEvent::TutorialTick);
        self.sync_overlay_audio();
    }

    fn sync_overlay_audio(&mut self) {
        if self.paused || self.settings_open {
            self.audio(AudioCommand::SuspendLogic(true));
        } else {
            self.audio(AudioCommand::SuspendLogic(false));
            self.audio(AudioCommand::StartMusic { restart: false });
            self.audio(AudioCommand::SetDucked(self.tutorial.is_some()));
        }
    }

    fn fire(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::WarpReverse => self.begin_warp_reverse(),
            TimerEvent::BeginExpansion { level } => self.begin_expansion(level),
            TimerEvent::ExpansionTick => self.expansion_tick(),
            TimerEvent::TutorialTick => self.tutorial_tick(),
            TimerEvent::AliasSpin { stage, from } => self.alias_spin_stage(stage, from),
            TimerEvent::Clear(what) => self.clear(what),
        }
    }

    fn clear(&mut self, what: Clear) {
        match what {
            Clear::LevelAnnouncement => self.level_announcement = None,
            Clear::LifeBanner => self.life_banner = false,
            Clear::WarpBanner => self.warp_banner = false,
            Clear::IntroMessage => self.intro_message = None,
            Clear::Countdown => self.countdown = None,
            Clear::Flash => self.flash = None,
            Clear::Pulse => self.pulse = false,
            Clear::Text(id) => self.texts.retain(|t| t.id != id),
        }
    }

    fn tutorial_tick(&mut self) {
        let Transition::TutorialCountdown { remaining } = self.transition else { return };
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.transition = Transition::TutorialCountdown { remaining };
            self.countdown = Some(remaining.to_string());
            self.schedule_in(COUNTDOWN_STEP_MS, TimerEvent::TutorialTick);
        } else {
            self.transition = Transition::Idle;
            self.countdown = Some("GO!".to_owned());
            self.schedule_in(GO_MS, TimerEvent::Clear(Clear::Countdown));
            self.last_spawn_y = self.next_spawn_distance + POST_TUTORIAL_PRIME;
            self.cursor = SpawnCursor::AwaitingSet;
        }
    }

    /// Spins the HUD through random colors and commits a new color rule.
    pub(crate) fn start_alias_spin(&mut self) {
        self.audio(AudioCommand::Play(Cue::Spin));
        let from = self.hud_rule.target;
        self.timers.cancel_where(|e| matches!(e, TimerEvent::AliasSpin { .. }));
        for stage in 0..3u8 {
            self.schedule_in(stage as f64 * ALIAS_SPIN_STEP_MS, TimerEvent::AliasSpin { stage, from });
        }
    }

    fn alias_spin_stage(&mut self, stage: u8, from: Color) {
        let seed_rule = Rule { kind: RuleKind::MatchColor, target: from };
        let rule = generate_rule(&mut self.rng, Some(&seed_rule), Some(RuleKind::MatchColor));
        self.alias_word = Some(effects::alias_word(&mut self.rng, rule.target));
        if stage < 2 {
            self.spin_rule = Some(rule);
            return;
        }
        debug!("alias spin committed {:?}", rule.target);
        self.spin_rule = None;
        self.current_rule = rule;
        for row in self.rows.iter_mut().filter(|r| !r.passed && r.kind == RowKind::Standard) {
            let lanes = row.lane_count();
            row.rule = rule;
            row.items = regenerate_row_items(&mut self.rng, &rule, lanes);
        }
        self.hud_rule = rule;
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.outbox.push(event);
    }

    pub(crate) fn audio(&mut self, command: AudioCommand) {
        self.emit(GameEvent::Audio(command));
    }

    pub(crate) fn schedule_in(&mut self, delay_ms: f64, event: TimerEvent) {
        self.timers.schedule(self.clock_ms + delay_ms, event);
    }

    pub(crate) fn add_text(&mut self, lane: usize, y: f64, text: &str, tone: TextTone) -> u64 {
        let id = self.next_text_id;
        self.next_text_id += 1;
        self.texts.push(FloatingText {
            id,
            lane,
            y,
            text: text.to_owned(),
            tone,
            expires_at_ms: self.clock_ms + FLOATING_TEXT_MS,
        });
        self.schedule_in(FLOATING_TEXT_MS, TimerEvent::Clear(Clear::Text(id)));
        id
    }

    pub(crate) fn show_flash(&mut self, flash: Flash) {
        self.flash = Some(flash);
        self.timers.cancel(TimerEvent::Clear(Clear::Flash));
        self.schedule_in(FLASH_MS, TimerEvent::Clear(Clear::Flash));
    }

    pub(crate) fn announce_level(&mut self, level: u32) {
        self.level_announcement = Some(level);
        self.timers.cancel(TimerEvent::Clear(Clear::LevelAnnouncement));
        self.schedule_in(ANNOUNCEMENT_MS, TimerEvent::Clear(Clear::LevelAnnouncement));
    }

    pub(crate) fn show_intro(&mut self, text: &str, duration_ms: f64) {
        self.intro_message = Some(text.to_owned());
        self.timers.cancel(TimerEvent::Clear(Clear::IntroMessage));
        self.schedule_in(duration_ms, TimerEvent::Clear(Clear::IntroMessage));
    }
}
