//! Connecting to partitioned columnar datasets on object storage.
//!
//! A [`RemoteDataset`] is a read-only handle over a parquet dataset laid out
//! under a base URI, with partition values embedded in the path hierarchy.
//! Connecting transfers metadata only (the schema, read from parquet footers);
//! row data moves when a plan obtained from [`RemoteDataset::scan`] is
//! materialized.

use crate::dataset::error::DatasetError;
use crate::query::plan::QueryPlan;
use bon::bon;
use log::{info, warn};
use polars::io::cloud::CloudOptions;
use polars::io::HiveOptions;
use polars::prelude::*;
use std::sync::Arc;

/// How partition values are encoded in the path hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStyle {
    /// One bare path segment per partition key, in the declared key order
    /// (`<base>/S1/2022/...`). Partition values bound at scan time become
    /// literal columns in the output; unbound keys do not appear as columns.
    Directory,
    /// Hive-style `key=value` segments (`<base>/site_id=S1/...`). Partition
    /// columns are parsed out of the paths by the engine and appear in the
    /// output whether or not they were bound.
    HiveKeyValue,
}

/// A lazy, queryable handle over a remote (or local) partitioned dataset.
///
/// The handle carries the base path, the partition-key ordering, and the
/// schema resolved at connect time. It is read-only; the cached schema is safe
/// to reuse across repeated queries.
///
/// # Example
///
/// ```no_run
/// use ecocast::{PartitionStyle, RemoteDataset};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ecocast::EcocastError> {
/// let drivers = RemoteDataset::connect()
///     .base_uri("s3://drivers-bucket/stage2/parquet")
///     .partition_keys(vec!["site_id".to_string()])
///     .style(PartitionStyle::Directory)
///     .anonymous(true)
///     .call()
///     .await?;
///
/// let table = drivers
///     .scan_partitions(&[("site_id", "BARC")])?
///     .materialize()?;
/// println!("{}", table.frame);
/// # Ok(())
/// # }
/// ```
pub struct RemoteDataset {
    base_uri: String,
    partition_keys: Vec<String>,
    style: PartitionStyle,
    anonymous: bool,
    region: Option<String>,
    endpoint: Option<String>,
    schema: SchemaRef,
}

#[bon]
impl RemoteDataset {
    /// Opens a dataset and resolves its schema.
    ///
    /// # Arguments
    ///
    /// * `.base_uri(..)`: **Required.** `s3://bucket/prefix` for object
    ///   storage, or a local directory path.
    /// * `.partition_keys(..)`: Optional. Ordered partition-key names matching
    ///   the path hierarchy. Defaults to none.
    /// * `.style(..)`: Optional. [`PartitionStyle`]; defaults to
    ///   [`PartitionStyle::Directory`].
    /// * `.anonymous(..)`: Optional. Read with unsigned requests (public
    ///   buckets). Defaults to `false`.
    /// * `.region(..)` / `.endpoint(..)`: Optional overrides for the storage
    ///   client's connection defaults.
    ///
    /// Connection defaults also honour two environment toggles:
    /// `AWS_EC2_METADATA_DISABLED` stops cloud-provider metadata
    /// auto-discovery, and an empty `AWS_DEFAULT_REGION` clears the default
    /// region. Both only affect connectivity, never query semantics.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Connection`] when the endpoint is unreachable
    /// or the base path does not exist, and [`DatasetError::CloudConfig`] when
    /// the storage configuration is rejected.
    #[builder]
    pub async fn connect(
        #[builder(into)] base_uri: String,
        partition_keys: Option<Vec<String>>,
        style: Option<PartitionStyle>,
        anonymous: Option<bool>,
        #[builder(into)] region: Option<String>,
        #[builder(into)] endpoint: Option<String>,
    ) -> Result<RemoteDataset, DatasetError> {
        let mut dataset = RemoteDataset {
            base_uri: base_uri.trim_end_matches('/').to_string(),
            partition_keys: partition_keys.unwrap_or_default(),
            style: style.unwrap_or(PartitionStyle::Directory),
            anonymous: anonymous.unwrap_or(false),
            region,
            endpoint,
            schema: Arc::new(Schema::default()),
        };

        // Schema probe: reads parquet footers only, no row data.
        let frame = dataset.scan_frame(&[])?;
        let schema = tokio::task::spawn_blocking(move || {
            let mut frame = frame;
            frame.collect_schema()
        })
        .await?
        .map_err(|source| DatasetError::Connection {
            uri: dataset.base_uri.clone(),
            source,
        })?;

        info!(
            "Connected to dataset at '{}' ({} columns, partition keys {:?})",
            dataset.base_uri,
            schema.len(),
            dataset.partition_keys
        );
        dataset.schema = schema;
        Ok(dataset)
    }
}

impl RemoteDataset {
    /// The schema resolved at connect time.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn partition_keys(&self) -> &[String] {
        &self.partition_keys
    }

    pub fn style(&self) -> PartitionStyle {
        self.style
    }

    /// Starts a plan over the whole dataset.
    pub fn scan(&self) -> Result<QueryPlan, DatasetError> {
        self.scan_partitions(&[])
    }

    /// Starts a plan restricted to the given partition values.
    ///
    /// Bindings prune at the path level: paths outside the bound partitions
    /// are never listed, so excluded partitions are not fetched at all. This
    /// is the difference between this call and an ordinary
    /// [`filter`](QueryPlan::filter) on a partition column, which would still
    /// read every partition.
    ///
    /// For [`PartitionStyle::Directory`] the bindings must be a prefix of the
    /// declared key order; for [`PartitionStyle::HiveKeyValue`] any subset of
    /// the keys may be bound.
    pub fn scan_partitions(&self, bindings: &[(&str, &str)]) -> Result<QueryPlan, DatasetError> {
        self.scan_frame(bindings).map(QueryPlan::new)
    }

    fn scan_frame(&self, bindings: &[(&str, &str)]) -> Result<LazyFrame, DatasetError> {
        let uri = self.scan_uri(bindings)?;
        let args = ScanArgsParquet {
            cloud_options: self.cloud_options()?,
            hive_options: HiveOptions {
                enabled: Some(self.style == PartitionStyle::HiveKeyValue),
                ..Default::default()
            },
            ..Default::default()
        };

        info!("Scanning '{}'", uri);
        let mut frame =
            LazyFrame::scan_parquet(&uri, args).map_err(|source| DatasetError::Connection {
                uri: uri.clone(),
                source,
            })?;

        if self.style == PartitionStyle::Directory {
            // Bare path segments carry no column data; surface the bound
            // values as literal columns so downstream keys line up.
            for (key, value) in bindings {
                frame = frame.with_column(lit(value.to_string()).alias(*key));
            }
        }
        Ok(frame)
    }

    fn scan_uri(&self, bindings: &[(&str, &str)]) -> Result<String, DatasetError> {
        for (position, (key, _)) in bindings.iter().enumerate() {
            if !self.partition_keys.iter().any(|k| k == key) {
                return Err(DatasetError::UnknownPartitionKey {
                    key: key.to_string(),
                    declared: self.partition_keys.clone(),
                });
            }
            if bindings[..position].iter().any(|(bound, _)| bound == key) {
                return Err(DatasetError::DuplicatePartitionBinding {
                    key: key.to_string(),
                });
            }
        }

        let segments: Vec<String> = match self.style {
            PartitionStyle::Directory => {
                // Bindings must line up with the leading declared keys, since
                // a bare value segment is only meaningful at its key's depth.
                for (position, (key, _)) in bindings.iter().enumerate() {
                    // In range: bindings are unique and all drawn from the
                    // declared keys, so there are never more of them.
                    let expected = &self.partition_keys[position];
                    if expected != key {
                        return Err(DatasetError::NonPrefixBinding {
                            expected: expected.clone(),
                            got: key.to_string(),
                            position,
                        });
                    }
                }
                bindings.iter().map(|(_, value)| value.to_string()).collect()
            }
            PartitionStyle::HiveKeyValue => self
                .partition_keys
                .iter()
                .map(|key| match bindings.iter().find(|(k, _)| k == key) {
                    Some((_, value)) => format!("{key}={value}"),
                    None => "*".to_string(),
                })
                .collect(),
        };

        let mut uri = self.base_uri.clone();
        for segment in &segments {
            uri.push('/');
            uri.push_str(segment);
        }
        uri.push_str("/**/*.parquet");
        Ok(uri)
    }

    fn cloud_options(&self) -> Result<Option<CloudOptions>, DatasetError> {
        if !self.base_uri.contains("://") || self.base_uri.starts_with("file://") {
            return Ok(None);
        }

        let mut config: Vec<(String, String)> = Vec::new();
        if self.anonymous {
            config.push(("aws_skip_signature".to_string(), "true".to_string()));
        } else if metadata_discovery_disabled() {
            warn!(
                "Cloud-provider metadata auto-discovery is disabled; \
                 credentials must come from the environment or be unnecessary"
            );
        }

        match (&self.region, default_region()) {
            (Some(region), _) => config.push(("aws_region".to_string(), region.clone())),
            (None, Some(region)) => config.push(("aws_region".to_string(), region)),
            // Region cleared or never set; resolution is left to the endpoint.
            (None, None) => {}
        }

        if let Some(endpoint) = &self.endpoint {
            config.push(("aws_endpoint".to_string(), endpoint.clone()));
            if endpoint.starts_with("http://") {
                config.push(("aws_allow_http".to_string(), "true".to_string()));
            }
        }

        CloudOptions::from_untyped_config(&self.base_uri, config)
            .map(Some)
            .map_err(|source| DatasetError::CloudConfig {
                uri: self.base_uri.clone(),
                source,
            })
    }
}

fn metadata_discovery_disabled() -> bool {
    std::env::var("AWS_EC2_METADATA_DISABLED")
        .map(|value| {
            let value = value.trim().to_ascii_lowercase();
            value == "true" || value == "1" || value == "yes"
        })
        .unwrap_or(false)
}

/// An *empty* `AWS_DEFAULT_REGION` clears the default region rather than
/// setting an empty one.
fn default_region() -> Option<String> {
    match std::env::var("AWS_DEFAULT_REGION") {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
