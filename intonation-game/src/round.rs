//! Rounds, answers and playback cues.

use intonation_core::pitch::Direction;

/// What the player claims about a round.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    /// The probe is higher (`Up`) or lower (`Down`) than the reference.
    Direction(Direction),
    /// Scale degree `index` (1..=7) is mistuned in `direction`.
    Degree { index: usize, direction: Direction },
}

/// One generated round. Never mutated; the next round replaces it.
#[derive(Clone, Debug, PartialEq)]
pub struct Round {
    /// Frequencies in play order.
    pub stimulus: Vec<f32>,
    /// The frequency the probe is judged against.
    pub reference: f32,
    /// The frequency being judged.
    pub probe: f32,
    pub expected: Answer,
}

impl Round {
    /// The second note of a comparison pair. Chained rounds start from it.
    pub fn last_note(&self) -> Option<f32> {
        self.stimulus.last().copied()
    }
}

/// One step of a playback plan.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Cue {
    /// Play a tone for `secs`, then wait `secs` plus `gap_ms` before the next cue.
    Note { freq: f32, secs: f32, gap_ms: u64 },
    /// Hold the drone at `freq`. Restarted only if the root changed.
    Drone { freq: f32 },
    /// Wait without sound.
    Rest { ms: u64 },
    /// Open the input gate before playback has finished.
    OpenInput,
}

impl Cue {
    /// How long the playback waits after running this cue.
    pub fn wait_ms(&self) -> u64 {
        match *self {
            Cue::Note { secs, gap_ms, .. } => secs_to_ms(secs) + gap_ms,
            Cue::Rest { ms } => ms,
            Cue::Drone { .. } | Cue::OpenInput => 0,
        }
    }
}

/// Session-wide timing read from preferences at start.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Silence between consecutive stimulus notes.
    pub pause_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self { pause_ms: 100 }
    }
}

#[inline]
fn secs_to_ms(secs: f32) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}

/// Total playback time of a cue list.
pub fn plan_duration_ms(cues: &[Cue]) -> u64 {
    cues.iter().map(Cue::wait_ms).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_wait_includes_gap() {
        let c = Cue::Note { freq: 440.0, secs: 0.8, gap_ms: 100 };
        assert_eq!(c.wait_ms(), 900);
        assert_eq!(Cue::OpenInput.wait_ms(), 0);
        assert_eq!(Cue::Rest { ms: 1000 }.wait_ms(), 1000);
    }

    #[test]
    fn plan_duration_sums_waits() {
        let plan = [
            Cue::Drone { freq: 220.0 },
            Cue::Rest { ms: 1000 },
            Cue::Note { freq: 230.0, secs: 0.8, gap_ms: 0 },
        ];
        assert_eq!(plan_duration_ms(&plan), 1800);
    }

    #[test]
    fn bad_durations_do_not_wait() {
        let c = Cue::Note { freq: 440.0, secs: f32::NAN, gap_ms: 0 };
        assert_eq!(c.wait_ms(), 0);
    }
}
