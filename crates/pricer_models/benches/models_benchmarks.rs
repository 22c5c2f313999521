//! Criterion benchmarks for path generation.
//!
//! Benchmarks cover:
//! - Cross-asset path generation for one, two and three currencies
//! - Zero bond evaluation along a generated path

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_core::types::{Currency, DayCountConvention};
use pricer_models::amc::SinglePathCalculator;
use pricer_models::instruments::{ZeroBond, ZeroBondCalculator};
use pricer_models::models::{CrossAssetModel, FxBsParametrization, LgmParametrization};
use pricer_models::paths::{make_multi_path_generator, SequenceType, TimeGrid};

fn model(currencies: &[Currency]) -> Arc<CrossAssetModel> {
    let irs = currencies
        .iter()
        .map(|&c| LgmParametrization::new(c, 0.02, 0.01, 0.03).unwrap())
        .collect();
    let fxs = currencies[1..]
        .iter()
        .map(|&c| FxBsParametrization::new(c, 1.1, 0.12).unwrap())
        .collect();
    Arc::new(CrossAssetModel::uncorrelated(irs, fxs, DayCountConvention::ActualActual365).unwrap())
}

fn monthly_grid(years: usize) -> TimeGrid {
    let times: Vec<f64> = (1..=12 * years).map(|m| m as f64 / 12.0).collect();
    TimeGrid::from_positive_times(&times).unwrap()
}

fn bench_path_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_generation");
    let all = [Currency::EUR, Currency::USD, Currency::GBP];
    for n in 1..=3 {
        let m = model(&all[..n]);
        group.bench_with_input(BenchmarkId::new("currencies", n), &n, |b, _| {
            let mut gen =
                make_multi_path_generator(SequenceType::PseudoRandom, m.clone(), monthly_grid(10), 42)
                    .unwrap();
            b.iter(|| black_box(gen.next().path_size()));
        });
    }
    group.finish();
}

fn bench_zero_bond_path(c: &mut Criterion) {
    let m = model(&[Currency::EUR, Currency::USD]);
    let mut gen =
        make_multi_path_generator(SequenceType::PseudoRandom, m.clone(), monthly_grid(10), 7).unwrap();
    let path = gen.next().clone();
    let mut calc = ZeroBondCalculator::new(
        ZeroBond {
            currency: Currency::USD,
            maturity: 10.0,
            notional: 1.0,
        },
        m,
    )
    .unwrap();

    c.bench_function("zero_bond_simulate_path", |b| {
        b.iter(|| black_box(calc.simulate_path(&path, false).unwrap()))
    });
}

criterion_group!(benches, bench_path_generation, bench_zero_bond_path);
criterion_main!(benches);
