use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dataprep::preprocessing::{
    one_hot_encode, CleaningConfig, CleaningPipeline, ImputeStrategy, Imputer,
};
use polars::prelude::*;

const CITIES: [&str; 5] = ["Paris", "Lyon", "Nice", "Lille", "Nantes"];

/// Deterministic table with a gap every seventh numeric row and every
/// eleventh categorical row
fn create_data(n_rows: usize) -> DataFrame {
    let age: Vec<Option<f64>> = (0..n_rows)
        .map(|i| if i % 7 == 3 { None } else { Some(18.0 + (i * 13 % 60) as f64) })
        .collect();
    let income: Vec<Option<f64>> = (0..n_rows)
        .map(|i| if i % 7 == 5 { None } else { Some(20_000.0 + (i * 7919 % 90_000) as f64) })
        .collect();
    let city: Vec<Option<&str>> = (0..n_rows)
        .map(|i| if i % 11 == 4 { None } else { Some(CITIES[i * 3 % CITIES.len()]) })
        .collect();

    df!(
        "age" => age,
        "income" => income,
        "city" => city
    )
    .unwrap()
}

fn bench_imputation(c: &mut Criterion) {
    let mut group = c.benchmark_group("imputation");

    for n_rows in [1_000, 10_000, 100_000].iter() {
        let df = create_data(*n_rows);

        for strategy in [ImputeStrategy::Mean, ImputeStrategy::Mode, ImputeStrategy::Drop] {
            group.bench_with_input(
                BenchmarkId::new(strategy.name(), n_rows),
                &df,
                |b, df| {
                    let imputer = Imputer::new(strategy);
                    b.iter(|| {
                        let mut df = df.clone();
                        imputer.impute(&mut df, "age").unwrap();
                        black_box(df)
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_one_hot(c: &mut Criterion) {
    let mut group = c.benchmark_group("one_hot");

    for n_rows in [1_000, 10_000, 100_000].iter() {
        let df = create_data(*n_rows);
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &df, |b, df| {
            b.iter(|| one_hot_encode(black_box(df), "city").unwrap())
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    let pipeline = CleaningPipeline::new(CleaningConfig::default()).unwrap();
    for n_rows in [10_000, 100_000].iter() {
        let df = create_data(*n_rows);
        group.bench_with_input(BenchmarkId::new("run", n_rows), &df, |b, df| {
            b.iter(|| pipeline.run(black_box(df.clone())).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_imputation, bench_one_hot, bench_pipeline);
criterion_main!(benches);
