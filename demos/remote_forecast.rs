//! End-to-end pipeline against a public S3 bucket.
//!
//! Usage:
//!
//! ```text
//! cargo run --example remote_forecast -- \
//!     s3://my-bucket/drivers s3://my-bucket/targets BARC
//! ```
//!
//! Both base URIs are expected to hold parquet data partitioned by a leading
//! `site_id` path segment, with `date`, `air_temp` columns on the driver side
//! and `date`, `water_temp` on the target side. Reads are anonymous, so this
//! works against any public bucket; set `AWS_EC2_METADATA_DISABLED=true` to
//! skip cloud-provider metadata lookups when running outside the provider.

use ecocast::{Aggregate, FittedModel, JoinMode, RemoteDataset};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(drivers_uri), Some(targets_uri), Some(site)) =
        (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: remote_forecast <drivers-uri> <targets-uri> <site-id>");
        std::process::exit(2);
    };

    let drivers = RemoteDataset::connect()
        .base_uri(drivers_uri)
        .partition_keys(vec!["site_id".to_string()])
        .anonymous(true)
        .call()
        .await?;
    let targets = RemoteDataset::connect()
        .base_uri(targets_uri)
        .partition_keys(vec!["site_id".to_string()])
        .anonymous(true)
        .call()
        .await?;

    let daily_drivers = drivers
        .scan_partitions(&[("site_id", site.as_str())])?
        .group_by(
            &["site_id", "date"],
            &[Aggregate::mean("air_temp").alias("air_temp_mean")],
        )
        .materialize()?;
    let target_table = targets
        .scan_partitions(&[("site_id", site.as_str())])?
        .materialize()?;

    let joined = target_table.join(&daily_drivers, &["site_id", "date"], JoinMode::Inner)?;
    let model = FittedModel::fit()
        .table(&joined)
        .response("water_temp")
        .predictors(&["air_temp_mean"])
        .call()?;

    println!(
        "fit water_temp ~ air_temp_mean at {site}: intercept {:.3}, slope {:.3}, r² {:.3} ({} rows)",
        model.intercept(),
        model.coefficients()[0],
        model.r_squared(),
        model.n_observations()
    );

    // Forecast over the most recent driver days as a stand-in covariate table.
    let forecast = model.forecast(&daily_drivers)?;
    println!("{}", forecast.frame.tail(Some(7)));
    Ok(())
}
