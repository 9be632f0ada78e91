#![cfg_attr(not(feature = "std"), no_std)]
//! Intonation Core: pitch math, difficulty curve and gain envelopes.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: polynomial sine / rational tanh on the render path
//!
//! Modules
//! - [`dsp`]        : math backend, utils (clamp, one-pole coefficients, ramps, soft clip)
//! - [`envelopes`]  : tone and drone gain envelopes, slew limiter
//! - [`filters`]    : one-pole low-pass
//! - [`pitch`]      : frequency band, semitone ratios, directions, major scale
//! - [`difficulty`] : level → interval curve
//!
//! Design
//! - No heap allocations; pure functions and small sample-by-sample state
//! - Randomness is always injected (`rand::Rng`), never global

pub mod difficulty;
pub mod dsp;
pub mod envelopes;
pub mod filters;
pub mod pitch;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::difficulty::DifficultyCurve;
    pub use crate::dsp::{clamp, kill_denormals, soft_clip, TAU};
    pub use crate::envelopes::{DroneEnv, SlewLimiter, ToneEnv, SILENCE_FLOOR};
    pub use crate::filters::OnePoleLP;
    pub use crate::pitch::{
        apply_interval, clamp_direction_to_band, direction_between, major_scale,
        random_root_frequency, ratio_for_semitones, Band, Direction, MAX_FREQ, MIN_FREQ,
    };
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        assert_eq!(clamp(2.0, 0.0, 1.0), 1.0);
        let _ = ToneEnv::new(0.5, 0.1, 0.8, 48000.0);
        let mut lp = OnePoleLP::new(1000.0, 48000.0);
        let _ = lp.process(0.1);
        let _ = DifficultyCurve::COMPARISON.interval_semitones(1);
        assert!(Band::PLAYABLE.contains(440.0));
    }
}
