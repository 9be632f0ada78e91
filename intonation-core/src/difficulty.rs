//! Adaptive difficulty: level → interval size in (fractional) semitones.
//!
//! `interval(level) = start * e^(-k * level) + min`
//!
//! The curve is stateless and strictly decreasing for `k > 0`; it approaches
//! `min` without ever reaching it, so generated pairs never collapse to unison.

use crate::dsp::m_exp;
use crate::pitch::ratio_for_semitones;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DifficultyCurve {
    /// Extra semitones on top of `min` at level 0.
    pub start: f32,
    /// Asymptote.
    pub min: f32,
    /// Decay rate per level.
    pub k: f32,
}

impl DifficultyCurve {
    /// Up/down comparison games (basic, consecutive, drone).
    pub const COMPARISON: DifficultyCurve = DifficultyCurve { start: 4.0, min: 0.1, k: 0.2 };
    /// Cadence resolution.
    pub const CADENCE: DifficultyCurve = DifficultyCurve { start: 0.8, min: 0.05, k: 0.15 };
    /// Scale mistuning.
    pub const SCALE: DifficultyCurve = DifficultyCurve { start: 0.8, min: 0.05, k: 0.12 };

    #[inline]
    pub const fn new(start: f32, min: f32, k: f32) -> Self {
        Self { start, min, k }
    }

    /// Interval in semitones for `level`.
    #[inline]
    pub fn interval_semitones(&self, level: u32) -> f32 {
        self.start * m_exp(-self.k * level as f32) + self.min
    }

    /// Frequency ratio for `level`.
    #[inline]
    pub fn ratio(&self, level: u32) -> f32 {
        ratio_for_semitones(self.interval_semitones(level))
    }
}
