//! Software tone mixer.
//!
//! `ToneSynth` owns every sounding voice: any number of overlapping one-shot
//! tones (bounded by [`MAX_VOICES`]) plus at most one live drone. Released
//! drones keep fading in the voice pool, so a new drone can start while the old
//! one is still dying away. It implements [`Generator`] so the device callback
//! and the C ABI can pull mono samples from it.

use intonation_core::dsp::soft_clip;
use intonation_core::envelopes::SlewLimiter;

use crate::error::{check_tone, AudioResult};
use crate::graph::Generator;
use crate::profile::SoundProfile;
use crate::tones::{DroneId, ToneEngine};
use crate::voice::{Voice, VoiceKind};

/// Voices mixed at once; the oldest tone is dropped when a new one needs room.
pub const MAX_VOICES: usize = 16;

/// Master gain glide time (ms).
const GAIN_SMOOTH_MS: f32 = 20.0;

#[derive(Debug)]
struct Drone {
    id: DroneId,
    profile: SoundProfile,
    voice: Voice,
}

#[derive(Debug)]
pub struct ToneSynth {
    sr: f32,
    voices: Vec<Voice>,
    drone: Option<Drone>,
    next_drone: u64,
    gain: f32,
    gain_sm: SlewLimiter,
    reap: bool,
}

impl ToneSynth {
    pub fn new(sr: f32) -> Self {
        let sr = sr.max(1.0);
        let mut gain_sm = SlewLimiter::new(GAIN_SMOOTH_MS, sr);
        gain_sm.reset(1.0);
        Self {
            sr,
            voices: Vec::with_capacity(MAX_VOICES),
            drone: None,
            next_drone: 0,
            gain: 1.0,
            gain_sm,
            reap: false,
        }
    }

    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }

    /// Master output gain, glided to avoid zipper noise. Non-finite values
    /// fall back to unity.
    #[inline] pub fn set_gain(&mut self, g: f32) { self.gain = if g.is_finite() { g.max(0.0) } else { 1.0 }; }

    #[inline] pub fn gain(&self) -> f32 { self.gain }

    /// One-shot tones still sounding.
    pub fn active_tones(&self) -> usize {
        self.voices.iter().filter(|v| v.kind() == VoiceKind::Tone && !v.finished()).count()
    }

    /// Released drones still fading out.
    pub fn fading_drones(&self) -> usize {
        self.voices.iter().filter(|v| v.kind() == VoiceKind::Drone && !v.finished()).count()
    }

    /// Frequency of the live (not released) drone.
    pub fn drone_freq(&self) -> Option<f32> {
        self.drone.as_ref().map(|d| d.voice.freq())
    }

    /// True if nothing would be heard.
    pub fn is_silent(&self) -> bool {
        self.drone.is_none() && self.voices.iter().all(Voice::finished)
    }

    fn push_voice(&mut self, v: Voice) {
        if self.voices.len() >= MAX_VOICES {
            self.voices.retain(|v| !v.finished());
        }
        if self.voices.len() >= MAX_VOICES {
            log::debug!(target: "synth", "voice pool full; dropping oldest voice");
            self.voices.remove(0);
        }
        self.voices.push(v);
    }

    fn release_drone(&mut self) {
        if let Some(Drone { id, mut voice, .. }) = self.drone.take() {
            log::debug!(target: "synth", "releasing drone {id:?} at {:.2} Hz", voice.freq());
            voice.release();
            self.push_voice(voice);
        }
    }
}

impl ToneEngine for ToneSynth {
    fn play_tone(&mut self, freq: f32, secs: f32, profile: SoundProfile) -> AudioResult<()> {
        check_tone(freq, secs)?;
        self.push_voice(Voice::tone(freq, secs, profile, self.sr));
        Ok(())
    }

    fn start_drone(&mut self, freq: f32, profile: SoundProfile) -> AudioResult<DroneId> {
        check_tone(freq, 0.0)?;
        self.release_drone();
        self.next_drone += 1;
        let id = DroneId(self.next_drone);
        self.drone = Some(Drone { id, profile, voice: Voice::drone(freq, profile, self.sr) });
        Ok(id)
    }

    fn stop_drone(&mut self, id: DroneId) -> AudioResult<()> {
        if matches!(&self.drone, Some(d) if d.id == id) {
            self.release_drone();
        }
        Ok(())
    }

    fn stop_all(&mut self) {
        self.voices.clear();
        self.drone = None;
    }
}

impl Generator for ToneSynth {
    /// Voices are built for one rate, so a rate change drops the one-shot
    /// tones and fading drones. The live drone keeps its id and is rebuilt
    /// at the new rate, fading back in.
    fn reset(&mut self, sr: f32) {
        let sr = sr.max(1.0);
        if sr == self.sr {
            return;
        }
        log::debug!(target: "synth", "sample rate {} -> {sr}; dropping {} voices", self.sr, self.voices.len());
        self.sr = sr;
        self.gain_sm.set_time_ms(GAIN_SMOOTH_MS, sr);
        self.voices.clear();
        if let Some(d) = &mut self.drone {
            d.voice = Voice::drone(d.voice.freq(), d.profile, sr);
        }
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let mut x = 0.0;
        if let Some(d) = &mut self.drone {
            x += d.voice.next();
        }
        for v in &mut self.voices {
            x += v.next();
            self.reap |= v.finished();
        }
        if self.reap {
            self.voices.retain(|v| !v.finished());
            self.reap = false;
        }
        let g = self.gain_sm.process(self.gain);
        soft_clip(x * g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(s: &mut ToneSynth, n: usize) -> f32 {
        let mut peak = 0.0_f32;
        for _ in 0..n { peak = peak.max(s.next().abs()); }
        peak
    }

    #[test]
    fn overlapping_tones_mix_and_expire() {
        let mut s = ToneSynth::new(1000.0);
        s.play_tone(440.0, 0.5, SoundProfile::Default).unwrap();
        s.play_tone(660.0, 0.8, SoundProfile::Default).unwrap();
        assert_eq!(s.active_tones(), 2);
        run(&mut s, 500);
        assert_eq!(s.active_tones(), 1);
        run(&mut s, 300);
        assert_eq!(s.active_tones(), 0);
        assert!(s.is_silent());
    }

    #[test]
    fn stopping_drone_mid_probe_leaves_probe_running() {
        let mut s = ToneSynth::new(1000.0);
        let drone = s.start_drone(220.0, SoundProfile::Default).unwrap();
        s.play_tone(233.08, 1.0, SoundProfile::Default).unwrap();
        run(&mut s, 300);
        s.stop_drone(drone).unwrap();
        assert_eq!(s.drone_freq(), None);
        assert_eq!(s.active_tones(), 1);
        assert_eq!(s.fading_drones(), 1);
        // drone fades for 0.5 s while the probe has 0.7 s left
        run(&mut s, 500);
        assert_eq!(s.fading_drones(), 0);
        assert_eq!(s.active_tones(), 1);
        run(&mut s, 200);
        assert_eq!(s.active_tones(), 0);
    }

    #[test]
    fn new_drone_replaces_the_old_one() {
        let mut s = ToneSynth::new(1000.0);
        let a = s.start_drone(200.0, SoundProfile::Default).unwrap();
        let b = s.start_drone(300.0, SoundProfile::Default).unwrap();
        assert_ne!(a, b);
        assert_eq!(s.drone_freq(), Some(300.0));
        assert_eq!(s.fading_drones(), 1);
        // stale handle is a no-op
        s.stop_drone(a).unwrap();
        assert_eq!(s.drone_freq(), Some(300.0));
    }

    #[test]
    fn stop_all_silences_immediately() {
        let mut s = ToneSynth::new(48000.0);
        s.start_drone(220.0, SoundProfile::Synth).unwrap();
        s.play_tone(440.0, 1.0, SoundProfile::Piano).unwrap();
        assert!(run(&mut s, 4800) > 0.0);
        s.stop_all();
        assert!(s.is_silent());
        assert_eq!(run(&mut s, 64), 0.0);
    }

    #[test]
    fn rejects_bad_tones() {
        let mut s = ToneSynth::new(48000.0);
        assert!(s.play_tone(0.0, 1.0, SoundProfile::Default).is_err());
        assert!(s.play_tone(f32::NAN, 1.0, SoundProfile::Default).is_err());
        assert!(s.play_tone(440.0, -1.0, SoundProfile::Default).is_err());
        assert_eq!(s.active_tones(), 0);
    }

    #[test]
    fn rate_change_rebuilds_the_drone_and_drops_tones() {
        let mut s = ToneSynth::new(1000.0);
        let drone = s.start_drone(220.0, SoundProfile::Guitar).unwrap();
        s.play_tone(330.0, 2.0, SoundProfile::Default).unwrap();
        run(&mut s, 600);

        s.reset(2000.0);
        assert_eq!(s.sample_rate(), 2000.0);
        assert_eq!(s.active_tones(), 0);
        assert_eq!(s.drone_freq(), Some(220.0));
        assert!(run(&mut s, 2000) > 0.0);

        // the id handed out before the change still stops the drone, and the
        // fade runs 0.5 s at the new rate
        s.stop_drone(drone).unwrap();
        assert_eq!(s.fading_drones(), 1);
        run(&mut s, 999);
        assert_eq!(s.fading_drones(), 1);
        run(&mut s, 1);
        assert!(s.is_silent());
    }

    #[test]
    fn reset_to_the_same_rate_keeps_voices() {
        let mut s = ToneSynth::new(1000.0);
        s.play_tone(330.0, 1.0, SoundProfile::Default).unwrap();
        s.reset(1000.0);
        assert_eq!(s.active_tones(), 1);
    }

    #[test]
    fn master_gain_glides_to_its_target() {
        let mut s = ToneSynth::new(1000.0);
        s.start_drone(220.0, SoundProfile::Default).unwrap();
        run(&mut s, 600);
        let full = run(&mut s, 200);
        s.set_gain(0.0);
        run(&mut s, 200);
        assert!(run(&mut s, 50) < full * 0.01);
        s.set_gain(f32::NAN);
        assert_eq!(s.gain(), 1.0);
    }

    #[test]
    fn pool_is_bounded() {
        let mut s = ToneSynth::new(48000.0);
        for i in 0..(MAX_VOICES + 4) {
            s.play_tone(200.0 + i as f32, 5.0, SoundProfile::Default).unwrap();
        }
        assert_eq!(s.active_tones(), MAX_VOICES);
    }
}
