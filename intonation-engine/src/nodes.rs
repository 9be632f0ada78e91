//! Oscillator building blocks for tone voices.
//!
//! Zero-allocation, per-sample components designed for realtime use.
//! Everything here is `Copy` and cheap to move; no locks, no heap.
//!
//! Notes:
//! - Frequency is **Hz**; methods expect the current **sample rate** when stepping.
//! - Not band-limited. Test tones sit between C3 and C6, where the aliasing of
//!   the naive saw/square is tolerable.

use intonation_core::dsp::sin_cycles;

/// Oscillator waveform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Wave { Sine, Tri, Saw, Square }

#[inline]
fn osc_sample(phase01: f32, wave: Wave) -> f32 {
    match wave {
        Wave::Sine   => sin_cycles(phase01),
        Wave::Tri    => 4.0 * (phase01 - 0.5).abs() - 1.0,
        Wave::Saw    => 2.0 * phase01 - 1.0,
        Wave::Square => if phase01 < 0.5 { 1.0 } else { -1.0 },
    }
}

/// Free-running oscillator.
#[derive(Copy, Clone, Debug)]
pub struct Osc {
    phase: f32,   // [0,1)
    freq:  f32,   // Hz
    wave:  Wave,
    gain:  f32,   // output gain (0..1)
}

impl Osc {
    #[inline] pub fn new(freq_hz: f32, wave: Wave) -> Self { Self { phase: 0.0, freq: freq_hz.max(0.0), wave, gain: 1.0 } }
    #[inline] pub fn with_gain(mut self, g: f32) -> Self { self.gain = g.max(0.0); self }

    /// Advance one sample and return the oscillator sample.
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        let s = osc_sample(self.phase, self.wave);
        self.phase = (self.phase + self.freq / sr) % 1.0;
        s * self.gain
    }
}
