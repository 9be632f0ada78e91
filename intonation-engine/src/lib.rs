//! Intonation Engine: tone synthesis behind the `ToneEngine` contract.
//!
//! Crate layout:
//! - [`graph`]    : `Generator` trait and the interleaved render helper
//! - [`nodes`]    : oscillators
//! - [`profile`]  : sound profiles (timbre recipes) and the loudness curve
//! - [`voice`]    : one sounding note (partials + envelope)
//! - [`synth`]    : `ToneSynth`, the voice mixer
//! - [`tones`]    : `ToneEngine` contract, `SharedSynth`, `SilentTones`
//! - [`realtime`] : CPAL device output (feature `realtime`)
//!
//! The mixer avoids heap work per sample; voices are plain `Copy` structs.

pub mod error;
pub mod graph;
pub mod nodes;
pub mod profile;
pub mod synth;
pub mod tones;
pub mod voice;

#[cfg(feature = "realtime")]
pub mod realtime;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use error::{AudioError, AudioResult};
pub use graph::Generator;
pub use nodes::{Osc, Wave};
pub use profile::SoundProfile;
pub use synth::ToneSynth;
pub use tones::{DroneId, SharedSynth, SilentTones, ToneEngine};
