use basis_stream::{
    BasisConfig, BasisSampler, DirectUpdate, FastUpdate, KernelKind, Replicated, SerialReduce,
    UpdateKernel,
};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::Rng;

fn random_vector(dim: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Sampler with `rank` random directions already absorbed.
fn prefilled_sampler(dim: usize, rank: usize, kernel: KernelKind) -> BasisSampler {
    let mut config = BasisConfig::for_dim(dim).unwrap();
    config.kernel = kernel;
    let mut sampler = BasisSampler::serial(config).unwrap();
    for i in 0..rank {
        sampler
            .take_sample(&random_vector(dim), i as f64 * 0.1)
            .unwrap();
    }
    sampler
}

fn bench_take_sample_novel(c: &mut Criterion) {
    let mut group = c.benchmark_group("take_sample_novel");

    for dim in [64, 256, 1024] {
        group.bench_with_input(BenchmarkId::new("dim", dim), &dim, |b, &dim| {
            b.iter_batched(
                || (prefilled_sampler(dim, 8, KernelKind::FastUpdate), random_vector(dim)),
                |(mut sampler, sample)| {
                    sampler.take_sample(black_box(&sample), 1.0).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_take_sample_redundant(c: &mut Criterion) {
    let mut group = c.benchmark_group("take_sample_redundant");

    for dim in [64, 256, 1024] {
        group.bench_with_input(BenchmarkId::new("dim", dim), &dim, |b, &dim| {
            b.iter_batched(
                || {
                    let mut sampler = prefilled_sampler(dim, 8, KernelKind::FastUpdate);
                    // A repeat of an absorbed sample stays within the span.
                    let seen = random_vector(dim);
                    sampler.take_sample(&seen, 0.9).unwrap();
                    (sampler, seen)
                },
                |(mut sampler, sample)| {
                    sampler.take_sample(black_box(&sample), 1.0).unwrap();
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_materialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("materialize");
    let dim = 512;
    let rank = 16;

    // Grow both kernels to the same rank with identity factors; the cost
    // under test is the factored product versus the plain copy.
    let mut fast = FastUpdate::new(dim);
    let mut direct = DirectUpdate::new(dim);
    let comm = SerialReduce;
    let first = random_vector(dim);
    fast.initialize(&first, 0.0, &comm).unwrap();
    direct.initialize(&first, 0.0, &comm).unwrap();
    for k in 1..rank {
        let mut column = vec![0.0; dim];
        column[k] = 1.0;
        let rotation = Replicated::identity(k + 1);
        let values = Replicated::identity(k + 1);
        fast.absorb_novel(&column, &rotation, &values).unwrap();
        direct.absorb_novel(&column, &rotation, &values).unwrap();
    }

    group.bench_function(BenchmarkId::new("kernel", "fast"), |b| {
        b.iter(|| black_box(fast.materialize().unwrap()));
    });
    group.bench_function(BenchmarkId::new("kernel", "direct"), |b| {
        b.iter(|| black_box(direct.materialize().unwrap()));
    });

    group.finish();
}

fn bench_project(c: &mut Criterion) {
    let mut sampler = prefilled_sampler(1024, 16, KernelKind::FastUpdate);
    let query = random_vector(1024);

    c.bench_function("project_1024d_rank16", |b| {
        b.iter(|| sampler.project(black_box(&query)).unwrap());
    });
}

fn bench_project_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("project_batch");

    for batch in [8, 64] {
        let mut sampler = prefilled_sampler(1024, 16, KernelKind::FastUpdate);
        let samples: Vec<Vec<f64>> = (0..batch).map(|_| random_vector(1024)).collect();

        group.bench_with_input(BenchmarkId::new("batch", batch), &batch, |b, _| {
            b.iter(|| sampler.project_batch(black_box(&samples)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_take_sample_novel,
    bench_take_sample_redundant,
    bench_materialize,
    bench_project,
    bench_project_batch,
);
criterion_main!(benches);
