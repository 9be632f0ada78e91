//! Frequency model: semitone ratios, playable band, directional relations.
//!
//! Everything here is a pure function of its arguments (plus an injected RNG
//! where a random choice is part of the contract), so round generators can be
//! tested deterministically with a seeded generator.

use rand::Rng;

use crate::dsp::m_powf;

/// Lowest playable frequency (C3).
pub const MIN_FREQ: f32 = 130.81;
/// Highest playable frequency (C6).
pub const MAX_FREQ: f32 = 1046.50;

/// Semitone offsets of the diatonic major scale, tonic to octave.
pub const MAJOR_SCALE_SEMITONES: [f32; 8] = [0.0, 2.0, 4.0, 5.0, 7.0, 9.0, 11.0, 12.0];

/// Relation between two frequencies: `Up` iff the second is higher.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Fair coin.
    #[inline]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) { Direction::Up } else { Direction::Down }
    }
}

/// Inclusive frequency band `[lo, hi]` in Hz.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Band {
    pub lo: f32,
    pub hi: f32,
}

impl Band {
    /// The full playable band, C3..C6.
    pub const PLAYABLE: Band = Band { lo: MIN_FREQ, hi: MAX_FREQ };

    #[inline]
    pub const fn new(lo: f32, hi: f32) -> Self { Self { lo, hi } }

    /// Root band leaving headroom for interval offsets: `[MIN*1.1, MAX/top_divisor]`.
    #[inline]
    pub fn safety(top_divisor: f32) -> Self {
        Self { lo: MIN_FREQ * 1.1, hi: MAX_FREQ / top_divisor }
    }

    #[inline]
    pub fn contains(&self, f: f32) -> bool { f >= self.lo && f <= self.hi }
}

/// `2^(s/12)`.
#[inline]
pub fn ratio_for_semitones(s: f32) -> f32 {
    m_powf(2.0, s / 12.0)
}

/// Uniform draw in `[band.lo, band.hi]`.
#[inline]
pub fn random_root_frequency<R: Rng + ?Sized>(band: Band, rng: &mut R) -> f32 {
    band.lo + (band.hi - band.lo) * rng.gen::<f32>()
}

/// `Up` if `b > a`, else `Down`. Callers must never pass equal frequencies.
#[inline]
pub fn direction_between(a: f32, b: f32) -> Direction {
    debug_assert!(a != b, "direction between equal frequencies ({a} Hz)");
    if b > a { Direction::Up } else { Direction::Down }
}

/// Apply `ratio` to `f` in direction `dir`.
#[inline]
pub fn apply_interval(f: f32, ratio: f32, dir: Direction) -> f32 {
    match dir {
        Direction::Up => f * ratio,
        Direction::Down => f / ratio,
    }
}

/// Pick a direction for moving `f` by `ratio` that keeps the result inside `band`.
///
/// If going up would leave the band the answer is forced `Down`; if going down
/// would leave it, `Up`; otherwise a fair coin.
pub fn clamp_direction_to_band<R: Rng + ?Sized>(f: f32, ratio: f32, band: Band, rng: &mut R) -> Direction {
    if f * ratio > band.hi {
        Direction::Down
    } else if f / ratio < band.lo {
        Direction::Up
    } else {
        Direction::random(rng)
    }
}

/// Eight frequencies of the major scale built on `root` (tonic..octave).
pub fn major_scale(root: f32) -> [f32; 8] {
    let mut out = [0.0; 8];
    for (o, s) in out.iter_mut().zip(MAJOR_SCALE_SEMITONES) {
        *o = root * ratio_for_semitones(s);
    }
    out
}
