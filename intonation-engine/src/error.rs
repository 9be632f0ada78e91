//! Error types for the tone engine.

use thiserror::Error;

/// Result type for tone engine operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Errors raised by tone playback and device setup.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Frequency is not a finite positive number.
    #[error("invalid frequency: {0} Hz")]
    InvalidFrequency(f32),

    /// Duration is negative or not finite.
    #[error("invalid duration: {0} seconds")]
    InvalidDuration(f32),

    /// The host has no default output device.
    #[error("no default output device")]
    NoDevice,

    /// A device was requested by name and not found.
    #[error("requested device not found: {0}")]
    DeviceNotFound(String),

    /// The device only offers sample formats we do not render.
    #[error("unsupported device sample format: {0}")]
    UnsupportedFormat(String),

    /// Anything the audio backend reports while opening or running a stream.
    #[error("audio backend: {0}")]
    Backend(String),

    /// The shared synthesizer lock was poisoned by a panicking holder.
    #[error("synthesizer lock poisoned")]
    Poisoned,
}

pub(crate) fn check_tone(freq: f32, secs: f32) -> AudioResult<()> {
    if !freq.is_finite() || freq <= 0.0 {
        return Err(AudioError::InvalidFrequency(freq));
    }
    if !secs.is_finite() || secs < 0.0 {
        return Err(AudioError::InvalidDuration(secs));
    }
    Ok(())
}
