//! Shared exporter state.
//!
//! The configuration and the collector built from it live together in one
//! immutable snapshot. Reloads build a new snapshot and swap it in whole, so a
//! scrape in flight keeps using the snapshot it started with.

use crate::azure::AzureClient;
use crate::config::{Config, ConfigError};
use crate::metrics::{Collector, ExporterMetrics};
use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("error creating Azure client: {0}")]
    Client(#[from] crate::azure::HttpError),
}

/// One consistent view of the configuration
pub struct Snapshot {
    pub config: Arc<Config>,
    pub collector: Collector,
}

impl Snapshot {
    /// Build a snapshot, reusing `previous`'s client (and its cached token)
    /// when the connection settings did not change
    pub fn build(config: Config, previous: Option<&Snapshot>) -> Result<Self, ReloadError> {
        let config = Arc::new(config);
        let client = match previous {
            Some(prev) if same_connection(&prev.config, &config) => {
                Arc::clone(prev.collector.client())
            }
            _ => Arc::new(AzureClient::new(
                &config.credentials,
                &config.endpoints,
                config.scrape.request_timeout(),
            )?),
        };

        Ok(Self {
            collector: Collector::new(client, Arc::clone(&config)),
            config,
        })
    }
}

fn same_connection(a: &Config, b: &Config) -> bool {
    a.credentials == b.credentials
        && a.endpoints == b.endpoints
        && a.scrape.request_timeout_secs == b.scrape.request_timeout_secs
}

pub struct ExporterState {
    config_path: PathBuf,
    current: ArcSwap<Snapshot>,
    reload_lock: Mutex<()>,
    pub metrics: ExporterMetrics,
}

impl ExporterState {
    pub fn new(config_path: PathBuf, snapshot: Snapshot, metrics: ExporterMetrics) -> Self {
        Self {
            config_path,
            current: ArcSwap::from_pointee(snapshot),
            reload_lock: Mutex::new(()),
            metrics,
        }
    }

    /// The snapshot to use for one scrape
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Re-read the configuration file and swap in a new snapshot. On error the
    /// current snapshot stays in place.
    pub async fn reload(&self) -> Result<(), ReloadError> {
        let _guard = self.reload_lock.lock().await;

        let config = Config::load(&self.config_path)?;
        let previous = self.current.load_full();
        let snapshot = Snapshot::build(config, Some(&previous))?;
        self.current.store(Arc::new(snapshot));

        tracing::info!("Reloaded configuration from {:?}", self.config_path);
        Ok(())
    }
}
