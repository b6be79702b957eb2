//! End-to-end pipeline against a locally written partitioned dataset.
//!
//! Writes two small parquet datasets (a daily meteorological driver and an
//! ecological target series) into a temp directory, then runs the full flow:
//! connect, prune to one site, aggregate to daily means, join, fit, forecast.

use ecocast::{Aggregate, EcocastError, FittedModel, JoinMode, RemoteDataset};
use polars::prelude::*;
use std::fs;
use std::path::Path;

fn write_parquet(path: &Path, mut frame: DataFrame) {
    let file = fs::File::create(path).expect("create parquet file");
    ParquetWriter::new(file)
        .finish(&mut frame)
        .expect("write parquet file");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let root = tempfile::tempdir()?;

    // Hourly air temperature driver, partitioned by site.
    let drivers_dir = root.path().join("drivers").join("BARC");
    fs::create_dir_all(&drivers_dir)?;
    write_parquet(
        &drivers_dir.join("part-0.parquet"),
        df!(
            "date" => ["2022-06-01", "2022-06-01", "2022-06-02", "2022-06-02", "2022-06-03", "2022-06-03"],
            "air_temp" => [21.0f64, 25.0, 22.0, 26.0, 23.0, 27.0],
        )?,
    );

    // Daily water temperature targets for the same site.
    let targets_dir = root.path().join("targets").join("BARC");
    fs::create_dir_all(&targets_dir)?;
    write_parquet(
        &targets_dir.join("part-0.parquet"),
        df!(
            "date" => ["2022-06-01", "2022-06-02", "2022-06-03"],
            "water_temp" => [18.5f64, 19.0, 19.5],
        )?,
    );

    let run = run_pipeline(root.path()).await?;
    println!("{}", run.frame);
    Ok(())
}

async fn run_pipeline(root: &Path) -> Result<ecocast::TimeSeriesTable, EcocastError> {
    let drivers = RemoteDataset::connect()
        .base_uri(root.join("drivers").to_string_lossy())
        .partition_keys(vec!["site_id".to_string()])
        .call()
        .await?;
    let targets = RemoteDataset::connect()
        .base_uri(root.join("targets").to_string_lossy())
        .partition_keys(vec!["site_id".to_string()])
        .call()
        .await?;

    // Daily mean of the sub-daily driver readings, one partition only.
    let daily_drivers = drivers
        .scan_partitions(&[("site_id", "BARC")])?
        .group_by(
            &["site_id", "date"],
            &[Aggregate::mean("air_temp").alias("air_temp_mean")],
        )
        .materialize()?;

    let target_table = targets
        .scan_partitions(&[("site_id", "BARC")])?
        .materialize()?;

    // Inner join: the model needs the driver as a non-null predictor.
    let joined = target_table.join(&daily_drivers, &["site_id", "date"], JoinMode::Inner)?;

    let model = FittedModel::fit()
        .table(&joined)
        .response("water_temp")
        .predictors(&["air_temp_mean"])
        .call()?;
    println!(
        "fit water_temp ~ air_temp_mean over {} rows, r² = {:.3}",
        model.n_observations(),
        model.r_squared()
    );

    // Forecast the next two days from a future driver table.
    let future = ecocast::TimeSeriesTable::new(
        df!(
            "date" => ["2022-06-04", "2022-06-05"],
            "air_temp_mean" => [25.5f64, 26.0],
        )
        .expect("future driver table"),
    );
    Ok(model.forecast(&future)?)
}
