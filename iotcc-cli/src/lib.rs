//! Record inspection behind the `iotcc` binary.
//!
//! Every command resolves a [`StoreConfig`] from the connector config (or
//! its defaults), applies any path overrides, and renders the requested
//! record as pretty JSON.

use anyhow::{Context, Result};
use iotcc_dcc::DccConfig;
use iotcc_store::{DiscoveryFile, RecordStore, StoreConfig};
use iotcc_types::RegEntityId;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads the connector config, or its defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<DccConfig> {
    match path {
        Some(path) => DccConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(DccConfig::default()),
    }
}

/// Path overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub summary_file: Option<PathBuf>,
    pub entity_dir: Option<PathBuf>,
    pub device_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, mut config: StoreConfig) -> StoreConfig {
        if let Some(path) = self.summary_file {
            config.summary_path = path;
        }
        if let Some(dir) = self.entity_dir {
            config.entity_dir = dir;
        }
        if let Some(dir) = self.device_dir {
            config.device_dir = dir;
        }
        config
    }
}

/// Read-only view of the records; creates nothing on disk.
fn open(config: StoreConfig) -> RecordStore {
    debug!("Reading records under {}", config.entity_dir.display());
    RecordStore::open_existing(config)
}

fn parse_uuid(uuid: &str) -> Result<RegEntityId> {
    RegEntityId::parse(uuid).with_context(|| format!("Invalid uuid {uuid:?}"))
}

/// The summary record.
pub fn show_summary(config: StoreConfig) -> Result<String> {
    let store = open(config);
    let summary = store
        .load_summary()
        .with_context(|| format!("Failed to read {}", store.summary_path().display()))?;
    Ok(serde_json::to_string_pretty(&summary)?)
}

/// One entity's cache record.
pub fn show_entity(config: StoreConfig, uuid: &str) -> Result<String> {
    let id = parse_uuid(uuid)?;
    let store = open(config);
    let record = store
        .load_cache(&id)?
        .with_context(|| format!("No cache record for {id}"))?;
    Ok(serde_json::to_string_pretty(&record.to_json())?)
}

/// One entity's discovery record.
pub fn show_discovery(config: StoreConfig, uuid: &str) -> Result<String> {
    let id = parse_uuid(uuid)?;
    let store = open(config);
    let record = store
        .load_discovery(&id)?
        .with_context(|| format!("No discovery record for {id}"))?;
    Ok(serde_json::to_string_pretty(&DiscoveryFile::from(record))?)
}

/// Rewrites the summary record as the empty template, creating its parent
/// directory if needed. Record directories are left alone.
pub fn reset_summary(config: StoreConfig) -> Result<()> {
    if let Some(parent) = config.summary_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let store = open(config);
    store
        .init_summary()
        .with_context(|| format!("Failed to reset {}", store.summary_path().display()))?;
    info!("Reset {}", store.summary_path().display());
    Ok(())
}
