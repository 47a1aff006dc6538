use serde::{Deserialize, Serialize};

use crate::audio::AudioCommand;

/// Side effects a frame asks the host to perform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Audio(AudioCommand),
    /// `navigator.vibrate` for this many milliseconds.
    Haptic { millis: u32 },
    ScoreChanged { score: u32 },
    /// Emitted once; the session ignores further steps afterwards.
    GameOver { score: u32, elapsed_ms: f64 },
}
