use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ghmm_core::dpdf::Dpdf;
use ghmm_core::emission::EmissionDist;
use ghmm_core::length::LengthDist;
use ghmm_core::model::{Model, ModelBuilder};
use ghmm_core::parse::Parse;
use ghmm_core::state::State;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn coin_state(name: &str, heads_p: f64) -> State {
    let table = Dpdf::from_linear(0, 2, &[1.0 - heads_p, heads_p]).unwrap();
    State::new(name, LengthDist::fixed(1), EmissionDist::stateless(table)).unwrap()
}

fn biased_coin_model() -> Model {
    let mut b = ModelBuilder::new();
    b.add_state("fair", coin_state("fair", 0.5)).unwrap();
    b.add_state("loaded", coin_state("loaded", 0.9)).unwrap();
    b.add_transition("__BEGIN__", "fair", 1.0).unwrap();
    b.add_transition("fair", "fair", 0.95).unwrap();
    b.add_transition("fair", "loaded", 0.049).unwrap();
    b.add_transition("fair", "__END__", 0.001).unwrap();
    b.add_transition("loaded", "loaded", 0.9).unwrap();
    b.add_transition("loaded", "fair", 0.099).unwrap();
    b.add_transition("loaded", "__END__", 0.001).unwrap();
    b.compile().unwrap()
}

fn decode_benchmark(c: &mut Criterion) {
    let model = biased_coin_model();
    let mut rng = StdRng::seed_from_u64(42);

    let mut group = c.benchmark_group("decode");
    for &len in &[64usize, 512, 4096] {
        let (_, seq) = model.generate(&mut rng);
        let seq: Vec<i64> = seq.into_iter().cycle().take(len).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &seq, |b, seq| {
            b.iter(|| {
                let mut parse = Parse::new(black_box(&model), black_box(seq.clone()));
                black_box(parse.decode())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, decode_benchmark);
criterion_main!(benches);
