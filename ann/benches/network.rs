use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ann::linear_algebra::{Matrix, Value};
use ann::{Network, NetworkConfig, TrainingExample};

criterion_main!(benches);
criterion_group!(benches, feedforward_mnist, gradient_descent_mnist);

const SHAPE: [usize; 3] = [784, 30, 10];

fn network(rng: &mut StdRng) -> Network {
    Network::new(&NetworkConfig::new(SHAPE), rng).unwrap()
}

fn example(rng: &mut StdRng) -> TrainingExample {
    let input: Vec<Value> = (0..SHAPE[0]).map(|_| rng.gen()).collect();
    let mut target = Matrix::zeros(SHAPE[2], 1);
    target[(rng.gen_range(0..SHAPE[2]), 0)] = 1.0;

    TrainingExample::new(Matrix::column(&input), target)
}

pub fn feedforward_mnist(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let network = network(&mut rng);
    let example = example(&mut rng);

    c.benchmark_group("benches")
        .measurement_time(Duration::from_secs(10))
        .bench_function("feedforward_784_30_10", |b| {
            b.iter(|| network.feedforward(black_box(&example.input)).unwrap())
        });
}

pub fn gradient_descent_mnist(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut network = network(&mut rng);
    let batch: Vec<_> = (0..10).map(|_| example(&mut rng)).collect();

    c.benchmark_group("benches")
        .measurement_time(Duration::from_secs(10))
        .bench_function("gradient_descent_784_30_10_batch_10", |b| {
            b.iter(|| network.gradient_descent(black_box(&batch)).unwrap())
        });
}
