//! Sound profiles: the timbre recipes a player can pick for every game.
//!
//! A profile maps a pitch to a waveform, a small set of harmonic partials, an
//! attack time and (for the plucked profile) a closing low-pass. The gain curve
//! is shared: low notes get a boost so the whole C3–C6 band sounds roughly
//! equally loud.

use core::fmt;
use core::str::FromStr;

use crate::nodes::Wave;

/// User-selectable timbre.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SoundProfile {
    /// Triangle below 300 Hz, sine above.
    #[default]
    Default,
    Piano,
    Guitar,
    Synth,
}

/// Closing low-pass for plucked timbres: the cutoff starts at `open * f0` and
/// glides exponentially to `closed * f0` over the tone.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pluck {
    pub open: f32,
    pub closed: f32,
}

/// Resolved recipe for one pitch.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Timbre {
    pub wave: Wave,
    /// `(frequency multiple, relative amplitude)`; the first entry is the fundamental.
    pub partials: &'static [(f32, f32)],
    pub attack_s: f32,
    /// Profile loudness trim applied on top of the pitch-dependent gain.
    pub trim: f32,
    pub pluck: Option<Pluck>,
}

const FUNDAMENTAL: &[(f32, f32)] = &[(1.0, 1.0)];
const PIANO_PARTIALS: &[(f32, f32)] = &[(1.0, 1.0), (2.0, 0.45), (3.0, 0.2), (4.0, 0.1)];
const SYNTH_PARTIALS: &[(f32, f32)] = &[(1.0, 1.0), (0.5, 0.35)];

/// Frequencies below this use the triangle in the default profile.
const TRI_BELOW_HZ: f32 = 300.0;

/// Bounds of the loudness compensation ramp.
const BOOST_LO_HZ: f32 = 130.0;
const BOOST_HI_HZ: f32 = 1046.0;

impl SoundProfile {
    pub const ALL: [SoundProfile; 4] =
        [SoundProfile::Default, SoundProfile::Piano, SoundProfile::Guitar, SoundProfile::Synth];

    pub fn name(self) -> &'static str {
        match self {
            SoundProfile::Default => "default",
            SoundProfile::Piano => "piano",
            SoundProfile::Guitar => "guitar",
            SoundProfile::Synth => "synth",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SoundProfile::Default => "Default (Sine/Tri)",
            SoundProfile::Piano => "Piano-ish",
            SoundProfile::Guitar => "Guitar-ish",
            SoundProfile::Synth => "Retro Synth",
        }
    }

    /// Recipe for a tone at `freq`.
    pub fn timbre(self, freq: f32) -> Timbre {
        match self {
            SoundProfile::Default => Timbre {
                wave: if freq < TRI_BELOW_HZ { Wave::Tri } else { Wave::Sine },
                partials: FUNDAMENTAL,
                attack_s: 0.1,
                trim: 1.0,
                pluck: None,
            },
            SoundProfile::Piano => Timbre {
                wave: Wave::Sine,
                partials: PIANO_PARTIALS,
                attack_s: 0.01,
                trim: 0.9,
                pluck: None,
            },
            SoundProfile::Guitar => Timbre {
                wave: Wave::Saw,
                partials: FUNDAMENTAL,
                attack_s: 0.005,
                trim: 0.7,
                pluck: Some(Pluck { open: 8.0, closed: 1.5 }),
            },
            SoundProfile::Synth => Timbre {
                wave: Wave::Square,
                partials: SYNTH_PARTIALS,
                attack_s: 0.03,
                trim: 0.45,
                pluck: None,
            },
        }
    }
}

impl fmt::Display for SoundProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoundProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(SoundProfile::Default),
            "piano" => Ok(SoundProfile::Piano),
            "guitar" => Ok(SoundProfile::Guitar),
            "synth" => Ok(SoundProfile::Synth),
            other => Err(format!("unknown sound profile: {other}")),
        }
    }
}

/// 1 at the bottom of the band, 0 at the top and above.
#[inline]
fn low_boost(freq: f32) -> f32 {
    (1.0 - (freq - BOOST_LO_HZ) / (BOOST_HI_HZ - BOOST_LO_HZ)).clamp(0.0, 1.0)
}

/// Peak gain of a one-shot tone at `freq`.
#[inline]
pub fn tone_peak(freq: f32) -> f32 {
    0.15 + 0.55 * low_boost(freq)
}

/// Sustain level of a drone at `freq`.
#[inline]
pub fn drone_level(freq: f32) -> f32 {
    0.08 + 0.2 * low_boost(freq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_switches_wave_at_300_hz() {
        assert_eq!(SoundProfile::Default.timbre(200.0).wave, Wave::Tri);
        assert_eq!(SoundProfile::Default.timbre(440.0).wave, Wave::Sine);
    }

    #[test]
    fn low_notes_are_louder() {
        assert!((tone_peak(130.0) - 0.70).abs() < 1e-6);
        assert!((tone_peak(1046.0) - 0.15).abs() < 1e-6);
        assert!((tone_peak(2000.0) - 0.15).abs() < 1e-6);
        assert!(drone_level(130.0) > drone_level(800.0));
    }

    #[test]
    fn names_parse_back() {
        for p in SoundProfile::ALL {
            assert_eq!(p.name().parse::<SoundProfile>(), Ok(p));
        }
        assert!("banjo".parse::<SoundProfile>().is_err());
    }
}
