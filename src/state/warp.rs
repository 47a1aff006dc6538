//! Warp challenge and lane-transition phases.

use serde::{Deserialize, Serialize};

/// Warp challenge progress.
///
/// `Run1` plays a set forward, `PrepReverse` lets the track coast to a stop
/// while the music slows down, `Run2` scrolls the same rows back up until row 1 is reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarpPhase {
    #[default]
    None,
    Run1,
    PrepReverse,
    Run2,
}

impl WarpPhase {
    pub fn is_active(self) -> bool {
        self != WarpPhase::None
    }

    pub fn is_reversed(self) -> bool {
        self == WarpPhase::Run2
    }

    /// Rows only leave the screen outside the forward half of the challenge.
    pub fn allows_despawn(self) -> bool {
        matches!(self, WarpPhase::None | WarpPhase::Run2)
    }

    pub fn allows_spawn(self) -> bool {
        matches!(self, WarpPhase::None | WarpPhase::Run1)
    }

    /// Scroll direction: +1 down the screen, -1 back up.
    pub fn direction(self) -> f64 {
        if self.is_reversed() { -1.0 } else { 1.0 }
    }
}

/// Level and tutorial transitions that suspend spawning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    #[default]
    Idle,
    /// Level banner before a lane expansion.
    Announcing { level: u32 },
    /// 3-2-1 before the fourth lane opens; the track is held.
    LaneCountdown { level: u32, remaining: u32 },
    /// 3-2-1 after the power-up tutorial is dismissed.
    TutorialCountdown { remaining: u32 },
}

impl Transition {
    pub fn is_idle(self) -> bool {
        self == Transition::Idle
    }

    pub fn holds_track(self) -> bool {
        matches!(self, Transition::LaneCountdown { .. })
    }

    /// Level-ups wait while a lane change is in flight.
    pub fn blocks_level_up(self) -> bool {
        matches!(self, Transition::Announcing { .. } | Transition::LaneCountdown { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warp_phases_gate_spawning_and_despawning() {
        assert!(WarpPhase::None.allows_spawn() && WarpPhase::None.allows_despawn());
        assert!(WarpPhase::Run1.allows_spawn() && !WarpPhase::Run1.allows_despawn());
        assert!(!WarpPhase::PrepReverse.allows_spawn() && !WarpPhase::PrepReverse.allows_despawn());
        assert!(!WarpPhase::Run2.allows_spawn() && WarpPhase::Run2.allows_despawn());
        assert_eq!(WarpPhase::Run2.direction(), -1.0);
    }

    #[test]
    fn only_lane_countdown_holds_the_track() {
        assert!(Transition::LaneCountdown { level: 3, remaining: 2 }.holds_track());
        assert!(!Transition::Announcing { level: 3 }.holds_track());
        assert!(!Transition::TutorialCountdown { remaining: 1 }.blocks_level_up());
        assert!(Transition::Announcing { level: 3 }.blocks_level_up());
    }
}
