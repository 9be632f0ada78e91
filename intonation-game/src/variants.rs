//! The five games as round policies over one session.
//!
//! A policy decides three things: how the next round is drawn, how it is
//! played (a cue list), and how an answer is judged. Everything else
//! (lives, levels, gating, timing) belongs to the session.

use core::fmt;

use rand::{Rng, RngCore};

use intonation_core::difficulty::DifficultyCurve;
use intonation_core::pitch::{
    apply_interval, clamp_direction_to_band, direction_between, major_scale, random_root_frequency,
    ratio_for_semitones, Band, Direction,
};

use crate::round::{Answer, Cue, Round, Timing};

/// Note length for up/down comparisons.
pub const COMPARISON_NOTE_S: f32 = 0.8;
/// Root and supertonic of the cadence.
pub const CADENCE_STEP_S: f32 = 0.6;
/// Cadence resolution note.
pub const RESOLUTION_NOTE_S: f32 = 0.8;
/// Each scale note.
pub const SCALE_NOTE_S: f32 = 0.5;
/// Settling time after the drone first starts.
pub const DRONE_SETTLE_MS: u64 = 1000;

const SUPERTONIC_SEMITONES: f32 = 2.0;
const LEADING_STEP_SEMITONES: f32 = 1.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    Basic,
    Consecutive,
    Drone,
    Cadence,
    Scale,
}

impl Variant {
    pub const ALL: [Variant; 5] =
        [Variant::Basic, Variant::Consecutive, Variant::Drone, Variant::Cadence, Variant::Scale];

    /// Menu number, 1..=5.
    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Variant::Basic),
            2 => Some(Variant::Consecutive),
            3 => Some(Variant::Drone),
            4 => Some(Variant::Cadence),
            5 => Some(Variant::Scale),
            _ => None,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Variant::Basic => 1,
            Variant::Consecutive => 2,
            Variant::Drone => 3,
            Variant::Cadence => 4,
            Variant::Scale => 5,
        }
    }

    /// Storage key fragment (`game1`..`game5`).
    pub fn key(self) -> &'static str {
        match self {
            Variant::Basic => "game1",
            Variant::Consecutive => "game2",
            Variant::Drone => "game3",
            Variant::Cadence => "game4",
            Variant::Scale => "game5",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Variant::Basic => "Higher or Lower",
            Variant::Consecutive => "Chained Pitches",
            Variant::Drone => "Over the Drone",
            Variant::Cadence => "Cadence Resolution",
            Variant::Scale => "Mistuned Scale",
        }
    }

    /// Root band for this game's generator.
    pub fn band(self) -> Band {
        match self {
            Variant::Basic | Variant::Consecutive | Variant::Drone => Band::safety(1.1),
            Variant::Cadence => Band::safety(1.5),
            Variant::Scale => Band::safety(2.5),
        }
    }

    pub fn curve(self) -> DifficultyCurve {
        match self {
            Variant::Basic | Variant::Consecutive | Variant::Drone => DifficultyCurve::COMPARISON,
            Variant::Cadence => DifficultyCurve::CADENCE,
            Variant::Scale => DifficultyCurve::SCALE,
        }
    }

    /// Policy with the stock difficulty curve.
    pub fn policy(self) -> Box<dyn RoundPolicy> {
        self.policy_with_curve(self.curve())
    }

    pub fn policy_with_curve(self, curve: DifficultyCurve) -> Box<dyn RoundPolicy> {
        match self {
            Variant::Basic => Box::new(Basic { curve }),
            Variant::Consecutive => Box::new(Consecutive { curve }),
            Variant::Drone => Box::new(Drone { curve }),
            Variant::Cadence => Box::new(Cadence { curve }),
            Variant::Scale => Box::new(Scale { curve }),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

pub trait RoundPolicy {
    fn variant(&self) -> Variant;

    fn curve(&self) -> DifficultyCurve;

    /// Draw the round for `level`. `prior` is the round it replaces.
    fn generate(&self, level: u32, prior: Option<&Round>, rng: &mut dyn RngCore) -> Round;

    /// Playback plan for `round`.
    fn cues(&self, round: &Round, level: u32, timing: Timing) -> Vec<Cue>;

    /// `None` when the answer has the wrong shape for this game.
    fn judge(&self, round: &Round, answer: &Answer) -> Option<bool> {
        match (answer, &round.expected) {
            (Answer::Direction(got), Answer::Direction(want)) => Some(got == want),
            _ => None,
        }
    }
}

/// Up/down pair from `f1` with the band-safe direction.
fn comparison_round(f1: f32, level: u32, curve: DifficultyCurve, band: Band, rng: &mut dyn RngCore) -> Round {
    let ratio = curve.ratio(level);
    let dir = clamp_direction_to_band(f1, ratio, band, rng);
    let f2 = apply_interval(f1, ratio, dir);
    Round {
        stimulus: vec![f1, f2],
        reference: f1,
        probe: f2,
        expected: Answer::Direction(direction_between(f1, f2)),
    }
}

/// Notes in order with the pause between them and none after the last.
fn note_sequence(freqs: &[f32], secs: f32, timing: Timing) -> Vec<Cue> {
    let last = freqs.len().saturating_sub(1);
    freqs
        .iter()
        .enumerate()
        .map(|(i, &freq)| Cue::Note { freq, secs, gap_ms: if i == last { 0 } else { timing.pause_ms } })
        .collect()
}

/// A carried-over root, if it is still usable in `band`.
fn carried(root: Option<f32>, band: Band) -> Option<f32> {
    root.filter(|f| band.contains(*f))
}

// ------------------------------------ 1. Basic -----------------------------------

#[derive(Copy, Clone, Debug)]
pub struct Basic {
    pub curve: DifficultyCurve,
}

impl RoundPolicy for Basic {
    fn variant(&self) -> Variant { Variant::Basic }
    fn curve(&self) -> DifficultyCurve { self.curve }

    fn generate(&self, level: u32, _prior: Option<&Round>, rng: &mut dyn RngCore) -> Round {
        let band = self.variant().band();
        let f1 = random_root_frequency(band, rng);
        comparison_round(f1, level, self.curve, band, rng)
    }

    fn cues(&self, round: &Round, _level: u32, timing: Timing) -> Vec<Cue> {
        note_sequence(&round.stimulus, COMPARISON_NOTE_S, timing)
    }
}

// --------------------------------- 2. Consecutive --------------------------------

/// The previous probe becomes the next reference, so the pitch drifts.
#[derive(Copy, Clone, Debug)]
pub struct Consecutive {
    pub curve: DifficultyCurve,
}

impl RoundPolicy for Consecutive {
    fn variant(&self) -> Variant { Variant::Consecutive }
    fn curve(&self) -> DifficultyCurve { self.curve }

    fn generate(&self, level: u32, prior: Option<&Round>, rng: &mut dyn RngCore) -> Round {
        let band = self.variant().band();
        let f1 = match carried(prior.and_then(Round::last_note), band) {
            Some(f) => f,
            None => random_root_frequency(band, rng),
        };
        comparison_round(f1, level, self.curve, band, rng)
    }

    /// Only the first level plays the reference; after that the player
    /// remembers it from the previous round.
    fn cues(&self, round: &Round, level: u32, timing: Timing) -> Vec<Cue> {
        if level <= 1 {
            note_sequence(&round.stimulus, COMPARISON_NOTE_S, timing)
        } else {
            note_sequence(&[round.probe], COMPARISON_NOTE_S, timing)
        }
    }
}

// ------------------------------------ 3. Drone -----------------------------------

#[derive(Copy, Clone, Debug)]
pub struct Drone {
    pub curve: DifficultyCurve,
}

impl RoundPolicy for Drone {
    fn variant(&self) -> Variant { Variant::Drone }
    fn curve(&self) -> DifficultyCurve { self.curve }

    fn generate(&self, level: u32, prior: Option<&Round>, rng: &mut dyn RngCore) -> Round {
        let band = self.variant().band();
        let f1 = match carried(prior.map(|r| r.reference), band) {
            Some(f) => f,
            None => random_root_frequency(band, rng),
        };
        comparison_round(f1, level, self.curve, band, rng)
    }

    fn cues(&self, round: &Round, level: u32, _timing: Timing) -> Vec<Cue> {
        let mut cues = vec![Cue::Drone { freq: round.reference }];
        if level <= 1 {
            cues.push(Cue::Rest { ms: DRONE_SETTLE_MS });
        }
        cues.push(Cue::Note { freq: round.probe, secs: COMPARISON_NOTE_S, gap_ms: 0 });
        cues
    }
}

// ----------------------------------- 4. Cadence ----------------------------------

/// Root, supertonic, then a resolution a semitone above the supertonic that
/// is pushed sharp or flat by the curve interval. The player judges the
/// actual resolution against the ideal one.
#[derive(Copy, Clone, Debug)]
pub struct Cadence {
    pub curve: DifficultyCurve,
}

impl RoundPolicy for Cadence {
    fn variant(&self) -> Variant { Variant::Cadence }
    fn curve(&self) -> DifficultyCurve { self.curve }

    fn generate(&self, level: u32, _prior: Option<&Round>, rng: &mut dyn RngCore) -> Round {
        let root = random_root_frequency(self.variant().band(), rng);
        let supertonic = root * ratio_for_semitones(SUPERTONIC_SEMITONES);
        let ideal = supertonic * ratio_for_semitones(LEADING_STEP_SEMITONES);
        let actual = apply_interval(ideal, self.curve.ratio(level), Direction::random(rng));
        Round {
            stimulus: vec![root, supertonic, actual],
            reference: ideal,
            probe: actual,
            expected: Answer::Direction(direction_between(ideal, actual)),
        }
    }

    /// Input opens as soon as the resolution starts.
    fn cues(&self, round: &Round, _level: u32, timing: Timing) -> Vec<Cue> {
        let mut cues = Vec::with_capacity(4);
        for &freq in &round.stimulus[..round.stimulus.len().saturating_sub(1)] {
            cues.push(Cue::Note { freq, secs: CADENCE_STEP_S, gap_ms: timing.pause_ms });
        }
        cues.push(Cue::OpenInput);
        cues.push(Cue::Note { freq: round.probe, secs: RESOLUTION_NOTE_S, gap_ms: 0 });
        cues
    }
}

// ------------------------------------ 5. Scale -----------------------------------

#[derive(Copy, Clone, Debug)]
pub struct Scale {
    pub curve: DifficultyCurve,
}

/// Degrees the player may name. The tonic (0) is never mistuned.
pub const SCALE_DEGREES: core::ops::RangeInclusive<usize> = 1..=7;

impl RoundPolicy for Scale {
    fn variant(&self) -> Variant { Variant::Scale }
    fn curve(&self) -> DifficultyCurve { self.curve }

    fn generate(&self, level: u32, _prior: Option<&Round>, rng: &mut dyn RngCore) -> Round {
        let root = random_root_frequency(self.variant().band(), rng);
        let mut scale = major_scale(root);
        let index = rng.gen_range(SCALE_DEGREES);
        let direction = Direction::random(rng);
        let ideal = scale[index];
        let actual = apply_interval(ideal, self.curve.ratio(level), direction);
        scale[index] = actual;
        Round {
            stimulus: scale.to_vec(),
            reference: ideal,
            probe: actual,
            expected: Answer::Degree { index, direction },
        }
    }

    fn cues(&self, round: &Round, _level: u32, timing: Timing) -> Vec<Cue> {
        note_sequence(&round.stimulus, SCALE_NOTE_S, timing)
    }

    /// Degree and direction are checked separately; both must match.
    fn judge(&self, round: &Round, answer: &Answer) -> Option<bool> {
        match (answer, &round.expected) {
            (Answer::Degree { index, direction }, Answer::Degree { index: want_i, direction: want_d }) => {
                if !SCALE_DEGREES.contains(index) {
                    return None;
                }
                Some(index == want_i && direction == want_d)
            }
            _ => None,
        }
    }
}
