use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ecocast::{Aggregate, FittedModel, QueryPlan, TimeSeriesTable};
use polars::prelude::*;

fn synthetic_table(rows: usize) -> TimeSeriesTable {
    let air: Vec<f64> = (0..rows).map(|i| 10.0 + (i % 20) as f64 * 0.5).collect();
    let rh: Vec<f64> = (0..rows).map(|i| 40.0 + (i % 50) as f64).collect();
    let water: Vec<f64> = air
        .iter()
        .zip(&rh)
        .map(|(a, r)| 2.0 + 0.5 * a - 0.1 * r)
        .collect();
    let site: Vec<&str> = (0..rows)
        .map(|i| if i % 2 == 0 { "S1" } else { "S2" })
        .collect();
    TimeSeriesTable::new(
        df!(
            "site_id" => site,
            "air_temp" => air,
            "rh" => rh,
            "water_temp" => water,
        )
        .unwrap(),
    )
}

fn bench_pipeline(c: &mut Criterion) {
    let table = synthetic_table(10_000);
    let model = FittedModel::fit()
        .table(&table)
        .response("water_temp")
        .predictors(&["air_temp", "rh"])
        .call()
        .unwrap();

    c.bench_function("group_by_mean_10k", |b| {
        b.iter(|| {
            QueryPlan::from_table(black_box(&table))
                .group_by(&["site_id"], &[Aggregate::mean("air_temp")])
                .materialize()
                .unwrap()
        })
    });
    c.bench_function("fit_10k", |b| {
        b.iter(|| {
            FittedModel::fit()
                .table(black_box(&table))
                .response("water_temp")
                .predictors(&["air_temp", "rh"])
                .call()
                .unwrap()
        })
    });
    c.bench_function("forecast_10k", |b| {
        b.iter(|| model.forecast(black_box(&table)).unwrap())
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
