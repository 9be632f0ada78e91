//! A single sounding note: a few partial oscillators under one gain envelope.

use intonation_core::dsp::exp_ramp_factor;
use intonation_core::envelopes::{DroneEnv, ToneEnv};
use intonation_core::filters::OnePoleLP;

use crate::nodes::Osc;
use crate::profile::{drone_level, tone_peak, SoundProfile};

/// Upper bound on partials per voice (fixed array, no heap).
pub const MAX_PARTIALS: usize = 4;

/// Drone fade-in time.
pub const DRONE_ATTACK_S: f32 = 0.5;
/// Drone fade-out time after `stop`.
pub const DRONE_RELEASE_S: f32 = 0.5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoiceKind {
    Tone,
    Drone,
}

#[derive(Copy, Clone, Debug)]
enum Env {
    Tone(ToneEnv),
    Drone(DroneEnv),
}

#[derive(Copy, Clone, Debug)]
struct Pluck {
    lp: OnePoleLP,
    mul: f32,
    floor_hz: f32,
}

#[derive(Copy, Clone, Debug)]
pub struct Voice {
    oscs: [Osc; MAX_PARTIALS],
    n: usize,
    env: Env,
    pluck: Option<Pluck>,
    freq: f32,
    sr: f32,
}

impl Voice {
    /// One-shot tone lasting `secs`.
    pub fn tone(freq: f32, secs: f32, profile: SoundProfile, sr: f32) -> Self {
        let timbre = profile.timbre(freq);
        let env = Env::Tone(ToneEnv::new(tone_peak(freq) * timbre.trim, timbre.attack_s, secs, sr));
        Self::build(freq, profile, env, Some(secs), sr)
    }

    /// Sustained drone; sounds until `release()` runs its fade out.
    pub fn drone(freq: f32, profile: SoundProfile, sr: f32) -> Self {
        let timbre = profile.timbre(freq);
        let env = Env::Drone(DroneEnv::new(drone_level(freq) * timbre.trim, DRONE_ATTACK_S, DRONE_RELEASE_S, sr));
        Self::build(freq, profile, env, None, sr)
    }

    fn build(freq: f32, profile: SoundProfile, env: Env, secs: Option<f32>, sr: f32) -> Self {
        let timbre = profile.timbre(freq);
        let norm: f32 = timbre.partials.iter().take(MAX_PARTIALS).map(|(_, a)| a).sum();
        let mut oscs = [Osc::new(0.0, timbre.wave); MAX_PARTIALS];
        let mut n = 0;
        for (slot, &(mult, amp)) in oscs.iter_mut().zip(timbre.partials) {
            *slot = Osc::new(freq * mult, timbre.wave).with_gain(amp / norm.max(1e-6));
            n += 1;
        }
        let pluck = timbre.pluck.map(|p| {
            let open = freq * p.open;
            let closed = freq * p.closed;
            // Drones have no natural end; close over a couple of seconds.
            let glide = secs.unwrap_or(2.0) * sr;
            Pluck { lp: OnePoleLP::new(open, sr), mul: exp_ramp_factor(open, closed, glide), floor_hz: closed }
        });
        Self { oscs, n, env, pluck, freq, sr }
    }

    #[inline]
    pub fn kind(&self) -> VoiceKind {
        match self.env {
            Env::Tone(_) => VoiceKind::Tone,
            Env::Drone(_) => VoiceKind::Drone,
        }
    }

    #[inline] pub fn freq(&self) -> f32 { self.freq }

    /// Begin the fade out (drones). Tones already end on their own.
    pub fn release(&mut self) {
        if let Env::Drone(d) = &mut self.env {
            d.release();
        }
    }

    #[inline]
    pub fn releasing(&self) -> bool {
        matches!(&self.env, Env::Drone(d) if d.releasing())
    }

    #[inline]
    pub fn finished(&self) -> bool {
        match &self.env {
            Env::Tone(e) => e.finished(),
            Env::Drone(e) => e.finished(),
        }
    }

    /// Advance one sample.
    #[inline]
    pub fn next(&mut self) -> f32 {
        let sr = self.sr;
        let mut x = 0.0;
        for osc in &mut self.oscs[..self.n] {
            x += osc.next(sr);
        }
        if let Some(p) = &mut self.pluck {
            x = p.lp.process(x);
            let cut = p.lp.cutoff_hz() * p.mul;
            if cut > p.floor_hz { p.lp.set_cutoff_hz(cut); }
        }
        let g = match &mut self.env {
            Env::Tone(e) => e.next(),
            Env::Drone(e) => e.next(),
        };
        x * g
    }
}
