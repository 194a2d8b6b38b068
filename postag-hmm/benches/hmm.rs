use criterion::{black_box, criterion_group, criterion_main, Criterion};
use postag_hmm::{decode_batch, viterbi, HiddenMarkovModel, Trainer, TrainerConfig};

const TAGS: [&str; 6] = ["DET", "NOUN", "VERB", "ADJ", "ADP", "PUNCT"];

struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }
}

/// Tagged sequences whose observations cluster around a per-tag center.
fn corpus(n: usize, len: usize, dim: usize, seed: u64) -> Vec<(Vec<Vec<f64>>, Vec<&'static str>)> {
    let mut rng = Lcg(seed);
    (0..n)
        .map(|_| {
            let tags: Vec<&str> = (0..len).map(|_| TAGS[rng.below(TAGS.len())]).collect();
            let obs = tags
                .iter()
                .map(|tag| {
                    let center = TAGS.iter().position(|t| t == tag).unwrap_or(0) as f64;
                    (0..dim).map(|_| center + rng.next_f64() - 0.5).collect()
                })
                .collect();
            (obs, tags)
        })
        .collect()
}

fn fit(data: &[(Vec<Vec<f64>>, Vec<&str>)], dim: usize) -> HiddenMarkovModel {
    let mut trainer = Trainer::new(dim, TrainerConfig::default()).unwrap();
    for (obs, tags) in data {
        trainer.observe(obs, tags).unwrap();
    }
    trainer.finish().unwrap()
}

fn bench_train(c: &mut Criterion) {
    let mut group = c.benchmark_group("train");
    let data = corpus(1_000, 20, 16, 42);

    group.bench_function("1k_seq_d16", |b| b.iter(|| fit(black_box(&data), 16)));

    group.finish();
}

fn bench_viterbi(c: &mut Criterion) {
    let mut group = c.benchmark_group("viterbi");
    let data = corpus(500, 20, 16, 7);
    let model = fit(&data, 16);

    let long = corpus(1, 200, 16, 11).remove(0).0;
    group.bench_function("200_tokens_d16", |b| {
        b.iter(|| viterbi(&model, black_box(&long)))
    });

    let batch: Vec<Vec<Vec<f64>>> = data.into_iter().map(|(obs, _)| obs).collect();
    group.bench_function("batch_500x20_d16", |b| {
        b.iter(|| decode_batch::<Vec<Vec<f64>>, Vec<f64>>(&model, black_box(&batch)))
    });

    group.finish();
}

criterion_group!(benches, bench_train, bench_viterbi);
criterion_main!(benches);
