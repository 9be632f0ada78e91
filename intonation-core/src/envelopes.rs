//! Gain envelopes and parameter slewing primitives.
//!
//! Provided envelopes:
//! - `ToneEnv`     : one-shot tone; **linear** attack, **exponential** decay to a floor
//! - `DroneEnv`    : sustained tone; linear attack, hold, exponential release
//! - `SlewLimiter` : one-pole slew/smoother for arbitrary control signals
//!
//! All envelopes are `no_std` friendly and avoid heap allocations.
//! Each exposes a per-sample `next()` and a `finished()` query so the mixer can
//! reclaim the voice.

use crate::dsp::{clamp, exp_ramp_factor, one_pole_coeff_ms};

/// Level treated as silence at the end of an exponential ramp.
pub const SILENCE_FLOOR: f32 = 0.001;

// ---------------------------------- Tone envelope --------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ToneStage {
    Attack,
    Decay,
    Done,
}

/// One-shot tone envelope: ramps linearly from 0 to `peak` over `attack_s`, then
/// exponentially down to [`SILENCE_FLOOR`] so that the floor is reached exactly
/// `total_s` after the start. After that it outputs 0 and reports `finished()`.
///
/// If `attack_s` is not shorter than `total_s` the attack is squeezed to a
/// quarter of the tone.
#[derive(Copy, Clone, Debug)]
pub struct ToneEnv {
    env:     f32,
    peak:    f32,
    a_inc:   f32,
    d_mul:   f32,
    left:    u32, // samples until the end of the current stage
    decay_n: u32,
    stage:   ToneStage,
}

impl ToneEnv {
    pub fn new(peak: f32, attack_s: f32, total_s: f32, sr: f32) -> Self {
        let sr = sr.max(1.0);
        let total_s = total_s.max(0.0);
        let attack_s = if attack_s < total_s { attack_s.max(0.0) } else { total_s * 0.25 };
        let atk_n = (attack_s * sr).round().max(1.0) as u32;
        let total_n = (total_s * sr).round() as u32;
        let decay_n = total_n.saturating_sub(atk_n).max(1);
        let peak = clamp(peak, 0.0, 1.0);
        Self {
            env: 0.0,
            peak,
            a_inc: peak / atk_n as f32,
            d_mul: exp_ramp_factor(peak, SILENCE_FLOOR, decay_n as f32),
            left: atk_n,
            decay_n,
            stage: if total_n == 0 { ToneStage::Done } else { ToneStage::Attack },
        }
    }

    /// Advance by one sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        match self.stage {
            ToneStage::Attack => {
                self.env = (self.env + self.a_inc).min(self.peak);
                self.left -= 1;
                if self.left == 0 {
                    self.env = self.peak;
                    self.stage = ToneStage::Decay;
                    self.left = self.decay_n;
                }
            }
            ToneStage::Decay => {
                self.env *= self.d_mul;
                self.left -= 1;
                if self.left == 0 {
                    self.env = 0.0;
                    self.stage = ToneStage::Done;
                }
            }
            ToneStage::Done => self.env = 0.0,
        }
        self.env
    }

    #[inline] pub fn finished(&self) -> bool { self.stage == ToneStage::Done }
}

// --------------------------------- Drone envelope --------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DroneStage {
    Attack,
    Hold,
    Release,
    Done,
}

/// Sustained envelope: linear attack to `level`, holds until `release()`, then an
/// exponential fade to [`SILENCE_FLOOR`] over the release time.
#[derive(Copy, Clone, Debug)]
pub struct DroneEnv {
    env:   f32,
    level: f32,
    a_inc: f32,
    rel_n: u32,
    r_mul: f32,
    left:  u32,
    stage: DroneStage,
}

impl DroneEnv {
    pub fn new(level: f32, attack_s: f32, release_s: f32, sr: f32) -> Self {
        let sr = sr.max(1.0);
        let level = clamp(level, 0.0, 1.0);
        let atk_n = (attack_s.max(0.0) * sr).round().max(1.0) as u32;
        Self {
            env: 0.0,
            level,
            a_inc: level / atk_n as f32,
            rel_n: (release_s.max(0.0) * sr).round().max(1.0) as u32,
            r_mul: 1.0,
            left: atk_n,
            stage: DroneStage::Attack,
        }
    }

    /// Start the fade-out from wherever the envelope currently is.
    pub fn release(&mut self) {
        if matches!(self.stage, DroneStage::Release | DroneStage::Done) {
            return;
        }
        self.r_mul = exp_ramp_factor(self.env, SILENCE_FLOOR, self.rel_n as f32);
        self.left = self.rel_n;
        self.stage = DroneStage::Release;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        match self.stage {
            DroneStage::Attack => {
                self.env = (self.env + self.a_inc).min(self.level);
                self.left -= 1;
                if self.left == 0 {
                    self.env = self.level;
                    self.stage = DroneStage::Hold;
                }
            }
            DroneStage::Hold => self.env = self.level,
            DroneStage::Release => {
                self.env *= self.r_mul;
                self.left -= 1;
                if self.left == 0 {
                    self.env = 0.0;
                    self.stage = DroneStage::Done;
                }
            }
            DroneStage::Done => self.env = 0.0,
        }
        self.env
    }

    #[inline] pub fn value(&self) -> f32 { self.env }
    #[inline] pub fn releasing(&self) -> bool { self.stage == DroneStage::Release }
    #[inline] pub fn finished(&self) -> bool { self.stage == DroneStage::Done }
}

// -------------------------------- Slew Limiter -----------------------------------

/// One-pole slew/smoother: `y += (x - y) * (1 - a)`
///
/// Use `alpha = one_pole_coeff_ms(t_ms, sr)`.
#[derive(Copy, Clone, Debug)]
pub struct SlewLimiter {
    alpha: f32,
    y:     f32,
}

impl SlewLimiter {
    #[inline]
    pub fn new(t_ms: f32, sr: f32) -> Self {
        Self { alpha: one_pole_coeff_ms(t_ms, sr), y: 0.0 }
    }

    #[inline]
    pub fn set_time_ms(&mut self, t_ms: f32, sr: f32) {
        self.alpha = one_pole_coeff_ms(t_ms, sr);
    }

    #[inline]
    pub fn reset(&mut self, y0: f32) { self.y = y0; }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += (x - self.y) * (1.0 - self.alpha);
        self.y
    }

    #[inline]
    pub fn value(&self) -> f32 { self.y }
}

// ------------------------------------ Tests --------------------------------------
