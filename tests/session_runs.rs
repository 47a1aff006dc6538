use stroop_runner::audio::{AudioCommand, Cue};
use stroop_runner::model::{PowerUp, RowKind, RuleKind};
use stroop_runner::state::WarpPhase;
use stroop_runner::{GameConfig, GameEvent, PracticeMode, Session, Settings};

const FRAME_MS: f64 = 16.67;

/// Only effects that leave the track readable.
fn calm_settings() -> Settings {
    let mut settings = Settings::default();
    for p in PowerUp::ALL {
        settings
            .power_ups
            .insert(p, matches!(p, PowerUp::Drunk | PowerUp::Fog | PowerUp::Gps));
    }
    settings
}

/// Lane the player should take for the next unresolved row, if it matters.
fn planned_lane(s: &Session, want: Option<PowerUp>) -> Option<usize> {
    let player_y = s.config().player_y;
    let hitbox = s.config().hitbox;
    let reversed = s.warp_phase().is_reversed();
    let row = s
        .rows()
        .iter()
        .filter(|r| !r.passed)
        .filter(|r| if reversed { r.y > player_y - hitbox } else { r.y < player_y + hitbox })
        .max_by(|a, b| {
            if reversed {
                b.y.total_cmp(&a.y)
            } else {
                a.y.total_cmp(&b.y)
            }
        })?;
    match row.kind {
        RowKind::Standard => row.correct_lane(),
        RowKind::Crate => row
            .items
            .iter()
            .position(|slot| slot.is_some_and(|item| item.effect.is_some() && item.effect == want)),
    }
}

fn steer(s: &mut Session, want: Option<PowerUp>) {
    let Some(lane) = planned_lane(s, want) else { return };
    let lane = if s.active_effect().inverts_controls() {
        s.lane_count() - 1 - lane
    } else {
        lane
    };
    s.select_lane(lane);
}

#[test]
fn perfect_run_expands_then_contracts_lanes() {
    let settings = calm_settings();
    let mut s = Session::with_seed(GameConfig::default(), PracticeMode::Off, 21);
    let mut saw_four_lanes = false;
    let mut level_ups = 0;

    for _ in 0..60 * 900 {
        steer(&mut s, None);
        let events = s.step(FRAME_MS, &settings);
        assert!(!s.is_over(), "crashed at {:.0}ms, level {}", s.elapsed_ms(), s.level());
        level_ups += events
            .iter()
            .filter(|e| matches!(e, GameEvent::Audio(AudioCommand::Play(Cue::LevelUp))))
            .count();

        if s.lane_count() == 4 {
            saw_four_lanes = true;
            assert_eq!(s.level(), 3);
        }
        if saw_four_lanes && s.level() == 4 {
            break;
        }
    }

    assert!(saw_four_lanes, "never reached the fourth lane");
    assert_eq!(s.level(), 4);
    assert_eq!(s.lane_count(), 3);
    assert_eq!(level_ups, 3);
    assert!(s.speed() > s.config().initial_speed);
    assert!(s.score() >= 9 * 5);
}

#[test]
fn warp_practice_rewinds_the_set_for_escalating_points() {
    let settings = Settings::default();
    let mut s = Session::with_seed(GameConfig::default(), PracticeMode::SingleCrate(PowerUp::Warp), 8);
    let mut rewinds = Vec::new();
    let mut all_events = Vec::new();
    let mut reversed_once = false;

    for _ in 0..60 * 300 {
        if s.snapshot().tutorial.is_some() {
            s.dismiss_tutorial();
        }
        steer(&mut s, Some(PowerUp::Warp));
        let events = s.step(FRAME_MS, &settings);
        assert!(!s.is_over());
        for e in &events {
            if let GameEvent::Audio(AudioCommand::Play(Cue::WarpRewind { set_index })) = e {
                rewinds.push(*set_index);
            }
        }
        all_events.extend(events);
        if s.warp_phase() == WarpPhase::Run2 {
            reversed_once = true;
        }
        if reversed_once && s.warp_phase() == WarpPhase::None {
            break;
        }
    }

    assert!(reversed_once, "the warp never reversed");
    assert_eq!(s.warp_phase(), WarpPhase::None);
    assert_eq!(rewinds, vec![5, 4, 3, 2, 1]);
    // Five forward hits at one point, then 6 + 7 + 8 + 9 + 10 on the way back.
    assert_eq!(s.score(), 45);
    assert_eq!(s.lives(), 0);

    let position = |cmd: AudioCommand| all_events.iter().position(|e| *e == GameEvent::Audio(cmd));
    let transition = position(AudioCommand::SetWarpTransition(true)).expect("slowdown started");
    let reverse_on = position(AudioCommand::SetReverse(true)).expect("music reversed");
    let reverse_off = all_events
        .iter()
        .rposition(|e| *e == GameEvent::Audio(AudioCommand::SetReverse(false)))
        .expect("music restored");
    assert!(transition < reverse_on && reverse_on < reverse_off);
}

#[test]
fn wrong_lane_without_lives_ends_the_run() {
    let settings = Settings::default();
    let mut s = Session::with_seed(GameConfig::default(), PracticeMode::Off, 3);
    let mut game_over = None;
    let mut all_events = Vec::new();

    for _ in 0..60 * 30 {
        if let Some(lane) = planned_lane(&s, None) {
            let wrong = (lane + 1) % s.lane_count();
            s.select_lane(wrong);
        }
        let events = s.step(FRAME_MS, &settings);
        for e in &events {
            if let GameEvent::GameOver { score, elapsed_ms } = e {
                game_over = Some((*score, *elapsed_ms));
            }
        }
        all_events.extend(events);
        if s.is_over() {
            break;
        }
    }

    let (score, elapsed_ms) = game_over.expect("run should end");
    assert_eq!(score, 0);
    assert!(elapsed_ms > 0.0);
    assert!(all_events.contains(&GameEvent::Audio(AudioCommand::StopMusic)));
    assert!(all_events.contains(&GameEvent::Haptic { millis: 800 }));
    assert!(all_events.contains(&GameEvent::Audio(AudioCommand::Play(Cue::Crash))));

    // A finished run no longer moves or reports anything.
    let frozen: Vec<f64> = s.rows().iter().map(|r| r.y).collect();
    assert!(s.step(FRAME_MS, &settings).is_empty());
    assert_eq!(frozen, s.rows().iter().map(|r| r.y).collect::<Vec<_>>());
}

#[test]
fn color_practice_never_spawns_crates() {
    let settings = Settings::default();
    let mut s = Session::with_seed(GameConfig::default(), PracticeMode::ColorOnly, 17);
    let mut seen_rows = 0;

    for _ in 0..60 * 120 {
        steer(&mut s, None);
        s.step(FRAME_MS, &settings);
        assert!(!s.is_over());
        for row in s.rows() {
            assert_eq!(row.kind, RowKind::Standard);
            assert_eq!(row.rule.kind, RuleKind::MatchColor);
        }
        seen_rows = seen_rows.max(s.rows().len());
    }
    assert!(seen_rows > 0);
    assert!(s.completed_sets() >= 3);
}

#[test]
fn four_lane_practice_never_changes_lane_count() {
    let settings = calm_settings();
    let mut s = Session::with_seed(GameConfig::default(), PracticeMode::FourLanes, 5);
    assert_eq!(s.lane_count(), 4);

    for _ in 0..60 * 240 {
        steer(&mut s, None);
        s.step(FRAME_MS, &settings);
        assert!(!s.is_over());
        assert_eq!(s.lane_count(), 4);
    }
    assert!(s.level() >= 3);
}

#[test]
fn pause_blocks_lane_input() {
    let settings = Settings::default();
    let mut s = Session::with_seed(GameConfig::default(), PracticeMode::Off, 2);
    s.step(FRAME_MS, &settings);
    s.toggle_pause();
    s.select_lane(0);
    assert_eq!(s.player_lane(), 1);
    s.toggle_pause();
    s.shift_lane(-1);
    assert_eq!(s.player_lane(), 0);
    s.shift_lane(-1);
    assert_eq!(s.player_lane(), 0);
}
