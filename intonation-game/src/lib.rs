//! Intonation game logic: rounds for the five ear-training games and the
//! session that plays them.
//!
//! - [`round`]    : rounds, answers, playback cues
//! - [`variants`] : the five round policies
//! - [`store`]    : key-value persistence (`MemoryStore`, `FileStore`)
//! - [`prefs`]    : preferences and high scores
//! - [`session`]  : the state machine driving a `ToneEngine`

pub mod prefs;
pub mod round;
pub mod session;
pub mod store;
pub mod variants;

pub use prefs::{AdvanceMode, DifficultyMode, Preferences, ScaleInput};
pub use round::{Answer, Cue, Round, Timing};
pub use session::{Phase, Session, SessionEvent, SessionState, Stage};
pub use store::{FileStore, MemoryStore, Store, StoreError};
pub use variants::{RoundPolicy, Variant};

// Types callers need alongside the session.
pub use intonation_core::pitch::Direction;
pub use intonation_engine::{SoundProfile, ToneEngine};
