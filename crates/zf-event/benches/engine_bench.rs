//! Playback runtime benchmarks

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use zf_event::{
    EngineConfig, Envelope, PlayArgs, ResourceTable, Zequence, ZequenceEntry, Zound, ZoundEngine,
    ZoundId, ZoundLibrary,
};

const DT: f32 = 1.0 / 60.0;

fn build_engine() -> ZoundEngine {
    let mut library = ZoundLibrary::new();
    let resources = ResourceTable::new();
    let mut layers = Zequence::default();
    for i in 1..=8u32 {
        library
            .insert(Zound::klip(i, format!("Layer {i}"), format!("layer{i}")))
            .unwrap();
        resources.set_ready(format!("layer{i}"), 600.0);
        layers = layers.with_entry(ZequenceEntry::new(ZoundId(i)).with_delay(i as f32 * 0.05));
    }
    library.insert(Zound::zequence(100, "Big Win", layers)).unwrap();

    let config = EngineConfig::default()
        .with_seed(1)
        .with_cooldown(0.0)
        .with_max_instances(0);
    ZoundEngine::new(config, library.into_shared(), resources)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_tick");

    for composites in [8usize, 64, 256] {
        let mut engine = build_engine();
        for _ in 0..composites {
            engine.play(ZoundId(100), PlayArgs::new());
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(composites * 9),
            &composites,
            |b, _| {
                b.iter(|| {
                    engine.tick(black_box(DT));
                })
            },
        );
    }

    group.finish();
}

fn bench_play_composite(c: &mut Criterion) {
    let mut engine = build_engine();

    c.bench_function("play_composite_8_layers", |b| {
        b.iter(|| {
            black_box(engine.play(ZoundId(100), PlayArgs::new()));
            engine.stop_all(false);
        })
    });
}

fn bench_envelope_evaluate(c: &mut Criterion) {
    let mut envelope = Envelope::unit();
    for i in 1..32 {
        let t = i as f32 / 32.0;
        envelope.add_point(t, (t * 6.0).sin().abs());
    }

    c.bench_function("envelope_evaluate_32pt", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for i in 0..1024 {
                sum += envelope.evaluate(black_box(i as f32 / 1024.0));
            }
            sum
        })
    });
}

criterion_group!(
    benches,
    bench_tick,
    bench_play_composite,
    bench_envelope_evaluate
);
criterion_main!(benches);
