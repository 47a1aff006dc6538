//! Stroop Runner core: rule generation, the session engine and procedural audio.

pub mod audio;
pub mod config;
pub mod effects;
pub mod generator;
pub mod model;
pub mod state;
pub mod util;

pub use config::{GameConfig, PracticeMode, Settings};
pub use state::{FrameSnapshot, GameEvent, Session};
