//! Player preferences and per-variant high scores, kept in a [`Store`].
//!
//! Preferences are read once when a session starts. A missing key, an
//! unreadable store or a garbled value all fall back to the default for that
//! key; the session never stops over storage trouble.

use std::fmt;
use std::str::FromStr;

use intonation_engine::SoundProfile;

use crate::round::Timing;
use crate::store::{Store, StoreError};
use crate::variants::Variant;

pub const KEY_SOUND_PROFILE: &str = "sound_profile";
pub const KEY_DIFFICULTY: &str = "difficulty";
pub const KEY_PAUSE_MS: &str = "pause_ms";
pub const KEY_ADVANCE_MODE: &str = "advance_mode";
pub const KEY_SCALE_INPUT: &str = "scale_input";

pub const DEFAULT_PAUSE_MS: u64 = 100;
pub const MAX_PAUSE_MS: u64 = 1000;
pub const PAUSE_STEP_MS: u64 = 100;

/// Easy mode lets the player replay the stimulus while answering.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DifficultyMode {
    Easy,
    #[default]
    Hard,
}

/// Fast continues by itself after an answer; Slow waits for the player.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AdvanceMode {
    #[default]
    Fast,
    Slow,
}

/// How the scale game takes its two-part answer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ScaleInput {
    /// Degree and direction in one submission.
    #[default]
    Combined,
    /// Two selectors; the verdict comes once both are picked.
    Split,
}

macro_rules! keyword_enum {
    ($ty:ident { $($var:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self { $($ty::$var => $s),+ }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($s => Ok($ty::$var),)+
                    other => Err(format!("unknown {}: {other:?}", stringify!($ty))),
                }
            }
        }
    };
}

keyword_enum!(DifficultyMode { Easy => "easy", Hard => "hard" });
keyword_enum!(AdvanceMode { Fast => "fast", Slow => "slow" });
keyword_enum!(ScaleInput { Combined => "combined", Split => "split" });

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Preferences {
    pub profile: SoundProfile,
    pub difficulty: DifficultyMode,
    pub pause_ms: u64,
    pub advance_mode: AdvanceMode,
    pub scale_input: ScaleInput,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            profile: SoundProfile::default(),
            difficulty: DifficultyMode::default(),
            pause_ms: DEFAULT_PAUSE_MS,
            advance_mode: AdvanceMode::default(),
            scale_input: ScaleInput::default(),
        }
    }
}

impl Preferences {
    /// Read every preference, substituting defaults for anything unusable.
    pub fn load(store: &dyn Store) -> Self {
        let d = Self::default();
        Self {
            profile: read_parsed(store, KEY_SOUND_PROFILE, d.profile),
            difficulty: read_parsed(store, KEY_DIFFICULTY, d.difficulty),
            pause_ms: snap_pause(read_parsed(store, KEY_PAUSE_MS, d.pause_ms)),
            advance_mode: read_parsed(store, KEY_ADVANCE_MODE, d.advance_mode),
            scale_input: read_parsed(store, KEY_SCALE_INPUT, d.scale_input),
        }
    }

    pub fn save(&self, store: &mut dyn Store) -> Result<(), StoreError> {
        store.set(KEY_SOUND_PROFILE, self.profile.name())?;
        store.set(KEY_DIFFICULTY, self.difficulty.as_str())?;
        store.set(KEY_PAUSE_MS, &snap_pause(self.pause_ms).to_string())?;
        store.set(KEY_ADVANCE_MODE, self.advance_mode.as_str())?;
        store.set(KEY_SCALE_INPUT, self.scale_input.as_str())?;
        Ok(())
    }

    pub fn timing(&self) -> Timing {
        Timing { pause_ms: self.pause_ms }
    }
}

/// Clamp to 0..=1000 ms and round to the nearest 100 ms step.
pub fn snap_pause(ms: u64) -> u64 {
    let ms = ms.min(MAX_PAUSE_MS);
    (ms + PAUSE_STEP_MS / 2) / PAUSE_STEP_MS * PAUSE_STEP_MS
}

fn read_parsed<T>(store: &dyn Store, key: &str, default: T) -> T
where
    T: FromStr + fmt::Debug,
    T::Err: fmt::Display,
{
    match store.get(key) {
        Ok(Some(raw)) => match raw.parse() {
            Ok(v) => v,
            Err(e) => {
                log::warn!(target: "store", "{key} = {raw:?} is invalid ({e}); using {default:?}");
                default
            }
        },
        Ok(None) => default,
        Err(e) => {
            log::warn!(target: "store", "reading {key} failed: {e}; using {default:?}");
            default
        }
    }
}

pub fn high_score_key(variant: Variant) -> String {
    format!("high_score.{}", variant.key())
}

/// Best level for `variant`, 0 if none recorded or unreadable.
pub fn high_score(store: &dyn Store, variant: Variant) -> u32 {
    read_parsed(store, &high_score_key(variant), 0)
}

/// Store `level` if it beats the recorded best. Returns whether it did.
pub fn record_high_score(store: &mut dyn Store, variant: Variant, level: u32) -> Result<bool, StoreError> {
    let key = high_score_key(variant);
    let best = match store.get(&key)? {
        Some(raw) => raw.parse::<u32>().unwrap_or(0),
        None => 0,
    };
    if level <= best {
        return Ok(false);
    }
    store.set(&key, &level.to_string())?;
    Ok(true)
}
