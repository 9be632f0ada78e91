//! The tone engine contract the games drive, plus its shared and silent forms.
//!
//! Timing is owned by the caller: `play_tone` starts a tone that will be audible
//! for exactly `secs`, and the caller waits that long (on its own clock) before
//! the next note. Tones overlap freely; at most one drone is live at a time.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{AudioError, AudioResult};
use crate::graph::Generator;
use crate::profile::SoundProfile;
use crate::synth::ToneSynth;

/// Handle to a started drone. Stopping a handle that has already been
/// replaced or stopped does nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DroneId(pub u64);

pub trait ToneEngine {
    /// Start a tone: linear attack, exponential decay, silent after `secs`.
    fn play_tone(&mut self, freq: f32, secs: f32, profile: SoundProfile) -> AudioResult<()>;

    /// Start the drone, releasing any drone that is already sounding.
    fn start_drone(&mut self, freq: f32, profile: SoundProfile) -> AudioResult<DroneId>;

    /// Fade out and release the drone `id`.
    fn stop_drone(&mut self, id: DroneId) -> AudioResult<()>;

    /// Silence every tone and the drone now.
    fn stop_all(&mut self);
}

impl<T: ToneEngine + ?Sized> ToneEngine for Box<T> {
    fn play_tone(&mut self, freq: f32, secs: f32, profile: SoundProfile) -> AudioResult<()> {
        (**self).play_tone(freq, secs, profile)
    }
    fn start_drone(&mut self, freq: f32, profile: SoundProfile) -> AudioResult<DroneId> {
        (**self).start_drone(freq, profile)
    }
    fn stop_drone(&mut self, id: DroneId) -> AudioResult<()> {
        (**self).stop_drone(id)
    }
    fn stop_all(&mut self) {
        (**self).stop_all();
    }
}

// --------------------------------- Silent fallback --------------------------------

/// Stand-in used when no audio device could be opened. Every call succeeds
/// and nothing is heard.
#[derive(Debug, Default)]
pub struct SilentTones {
    next_drone: u64,
}

impl SilentTones {
    pub fn new() -> Self { Self::default() }
}

impl ToneEngine for SilentTones {
    fn play_tone(&mut self, freq: f32, secs: f32, _profile: SoundProfile) -> AudioResult<()> {
        log::trace!(target: "audio", "silent tone {freq:.2} Hz for {secs:.2} s");
        Ok(())
    }

    fn start_drone(&mut self, _freq: f32, _profile: SoundProfile) -> AudioResult<DroneId> {
        self.next_drone += 1;
        Ok(DroneId(self.next_drone))
    }

    fn stop_drone(&mut self, _id: DroneId) -> AudioResult<()> { Ok(()) }

    fn stop_all(&mut self) {}
}

// ---------------------------------- Shared synth ---------------------------------

/// `ToneSynth` behind a mutex so the control side and the audio callback can
/// both reach it. Clones share the same synth.
#[derive(Clone, Debug)]
pub struct SharedSynth(Arc<Mutex<ToneSynth>>);

impl SharedSynth {
    pub fn new(sr: f32) -> Self {
        Self(Arc::new(Mutex::new(ToneSynth::new(sr))))
    }

    /// Lock for control calls. A poisoned lock is reported, not recovered.
    pub fn lock(&self) -> AudioResult<MutexGuard<'_, ToneSynth>> {
        self.0.lock().map_err(|_| AudioError::Poisoned)
    }

    /// Render interleaved audio. A poisoned lock renders silence.
    pub fn render_interleaved(&self, out: &mut [f32], channels: usize) -> usize {
        match self.0.lock() {
            Ok(mut synth) => crate::graph::render_interleaved(&mut *synth, out, channels),
            Err(_) => {
                out.fill(0.0);
                if channels == 0 { 0 } else { out.len() / channels }
            }
        }
    }

    /// Master output gain; see [`ToneSynth::set_gain`].
    pub fn set_gain(&self, gain: f32) -> AudioResult<()> {
        self.lock()?.set_gain(gain);
        Ok(())
    }

    /// Propagate a device sample-rate change; see [`ToneSynth`]'s `reset`.
    pub fn reset(&self, sr: f32) -> AudioResult<()> {
        self.lock()?.reset(sr);
        Ok(())
    }
}

impl ToneEngine for SharedSynth {
    fn play_tone(&mut self, freq: f32, secs: f32, profile: SoundProfile) -> AudioResult<()> {
        self.lock()?.play_tone(freq, secs, profile)
    }

    fn start_drone(&mut self, freq: f32, profile: SoundProfile) -> AudioResult<DroneId> {
        self.lock()?.start_drone(freq, profile)
    }

    fn stop_drone(&mut self, id: DroneId) -> AudioResult<()> {
        self.lock()?.stop_drone(id)
    }

    fn stop_all(&mut self) {
        // Silencing must work even if a previous holder panicked.
        self.0.lock().unwrap_or_else(PoisonError::into_inner).stop_all();
    }
}
