use criterion::{black_box, criterion_group, criterion_main, Criterion};
use intonation_engine::graph::render_interleaved;
use intonation_engine::{SoundProfile, ToneEngine, ToneSynth};

fn bench_render(c: &mut Criterion) {
    let sr = 48_000.0;
    let mut buf = vec![0.0_f32; 512 * 2];

    c.bench_function("drone_plus_probe_512_frames", |b| {
        let mut synth = ToneSynth::new(sr);
        synth.start_drone(220.0, SoundProfile::Default).unwrap();
        b.iter(|| {
            if synth.active_tones() == 0 {
                synth.play_tone(233.08, 0.8, SoundProfile::Default).unwrap();
            }
            black_box(render_interleaved(&mut synth, &mut buf, 2))
        });
    });

    c.bench_function("full_pool_piano_512_frames", |b| {
        let mut synth = ToneSynth::new(sr);
        b.iter(|| {
            while synth.active_tones() < intonation_engine::synth::MAX_VOICES {
                synth.play_tone(261.63, 2.0, SoundProfile::Piano).unwrap();
            }
            black_box(render_interleaved(&mut synth, &mut buf, 2))
        });
    });
}

criterion_group!(benches, bench_render);
criterion_main!(benches);
