//! Connector configuration.

use crate::error::{DccError, DccResult};
use iotcc_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration read once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DccConfig {
    /// Directory for discovery records.
    pub dev_file_path: PathBuf,
    /// Directory for cache records.
    pub entity_file_path: PathBuf,
    /// Path of the summary record.
    pub iotcc_path: PathBuf,
    /// Extra attempts when the summary record fails to parse.
    pub iotcc_load_retry: u32,
    /// Fetch remote properties for records written before the last boot.
    pub enable_reboot_getprop: bool,
    /// Budget for registration and property fetches (seconds).
    pub registration_timeout_secs: u64,
    /// Budget for unregistration (seconds).
    pub unregistration_timeout_secs: u64,
}

impl Default for DccConfig {
    fn default() -> Self {
        Self {
            dev_file_path: PathBuf::from("/var/lib/iotcc/devices"),
            entity_file_path: PathBuf::from("/var/lib/iotcc/entity"),
            iotcc_path: PathBuf::from("/var/lib/iotcc/iotcc.json"),
            iotcc_load_retry: 3,
            enable_reboot_getprop: false,
            registration_timeout_secs: 300,
            unregistration_timeout_secs: 20,
        }
    }
}

impl DccConfig {
    /// Places every record directory under one root.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let store = StoreConfig::under(root);
        Self {
            dev_file_path: store.device_dir,
            entity_file_path: store.entity_dir,
            iotcc_path: store.summary_path,
            ..Default::default()
        }
    }

    /// Loads a JSON config file. Missing keys take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> DccResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DccError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| DccError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the connector cannot run with.
    pub fn validate(&self) -> DccResult<()> {
        if self.registration_timeout_secs == 0 {
            return Err(DccError::Config("registration_timeout_secs must be > 0".into()));
        }
        if self.unregistration_timeout_secs == 0 {
            return Err(DccError::Config("unregistration_timeout_secs must be > 0".into()));
        }
        Ok(())
    }

    pub fn registration_timeout(&self) -> Duration {
        Duration::from_secs(self.registration_timeout_secs)
    }

    pub fn unregistration_timeout(&self) -> Duration {
        Duration::from_secs(self.unregistration_timeout_secs)
    }

    /// The record store layout.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            entity_dir: self.entity_file_path.clone(),
            device_dir: self.dev_file_path.clone(),
            summary_path: self.iotcc_path.clone(),
            load_retry: self.iotcc_load_retry,
        }
    }
}
