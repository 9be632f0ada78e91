//! Realtime render glue.
//!
//! This module defines the minimal `Generator` trait plus the interleaving
//! helper shared by the device callback and the C ABI: one **mono** sample per
//! frame, duplicated to every output channel.
//!
//! Design goals
//! - No dynamic allocations in the audio thread
//! - SR changes handled lazily through `reset`

/// Anything that can generate one sample at a time.
pub trait Generator {
    /// Called when the output is (re)initialized or when the sample rate changes.
    fn reset(&mut self, sr: f32);

    /// Generate the next mono sample. Implementations should assume the sample
    /// rate has been communicated via `reset`.
    fn next(&mut self) -> f32;
}

/// Fill `out` (interleaved, `channels` wide) from `gen`, hard-limited to
/// [-1, 1]. Returns the number of frames written.
pub fn render_interleaved<G: Generator + ?Sized>(gen: &mut G, out: &mut [f32], channels: usize) -> usize {
    if channels == 0 {
        return 0;
    }
    let mut frames = 0;
    for frame in out.chunks_exact_mut(channels) {
        let s = gen.next().clamp(-1.0, 1.0);
        for ch in frame.iter_mut() { *ch = s; }
        frames += 1;
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp(f32);
    impl Generator for Ramp {
        fn reset(&mut self, _sr: f32) { self.0 = 0.0; }
        fn next(&mut self) -> f32 { self.0 += 0.5; self.0 }
    }

    #[test]
    fn duplicates_mono_to_all_channels_and_limits() {
        let mut g = Ramp(0.0);
        let mut buf = [0.0_f32; 6];
        let n = render_interleaved(&mut g, &mut buf, 2);
        assert_eq!(n, 3);
        assert_eq!(buf, [0.5, 0.5, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn zero_channels_renders_nothing() {
        let mut g = Ramp(0.0);
        let mut buf = [0.0_f32; 4];
        assert_eq!(render_interleaved(&mut g, &mut buf, 0), 0);
    }
}
