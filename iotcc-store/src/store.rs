//! File-backed record store.
//!
//! One store, three projections keyed by server identifier:
//! - cache records: `<entity_dir>/<uuid>.json`, compact JSON
//! - discovery records: `<device_dir>/<uuid>.json`, pretty JSON
//! - the summary record: a single pretty JSON file
//!
//! Writes go to a sibling temp file and are renamed into place so a reader
//! never observes a half-written record. The store does no locking of its
//! own; callers serialize access.

use crate::cache::CacheRecord;
use crate::discovery::{DiscoveryFile, DiscoveryRecord};
use crate::error::{StoreError, StoreResult};
use crate::summary::SummaryRecord;
use iotcc_types::{RecordTimestamp, RegEntityId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where the records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding cache records.
    pub entity_dir: PathBuf,
    /// Directory holding discovery records.
    pub device_dir: PathBuf,
    /// Path of the summary record.
    pub summary_path: PathBuf,
    /// Extra attempts when the summary record fails to parse.
    pub load_retry: u32,
}

impl StoreConfig {
    /// Lays all three projections out under one root directory.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            entity_dir: root.join("entity"),
            device_dir: root.join("devices"),
            summary_path: root.join("iotcc.json"),
            load_retry: 3,
        }
    }
}

/// The record store.
#[derive(Debug)]
pub struct RecordStore {
    config: StoreConfig,
}

impl RecordStore {
    /// Opens the store, creating missing directories.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.entity_dir)?;
        fs::create_dir_all(&config.device_dir)?;
        if let Some(parent) = config.summary_path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { config })
    }

    /// Wraps a layout without touching the file system. Records that do
    /// not exist read as missing; writes fail until the directories exist.
    pub fn open_existing(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ── Cache records ────────────────────────────────────────────

    pub fn cache_path(&self, id: &RegEntityId) -> PathBuf {
        record_path(&self.config.entity_dir, id)
    }

    /// Loads a cache record; `Ok(None)` if none was ever written.
    pub fn load_cache(&self, id: &RegEntityId) -> StoreResult<Option<CacheRecord>> {
        let map: Option<serde_json::Map<String, serde_json::Value>> =
            read_json(&self.cache_path(id))?;
        Ok(map.map(CacheRecord::from_json))
    }

    /// Stamps and writes a cache record.
    pub fn save_cache(&self, id: &RegEntityId, record: &mut CacheRecord) -> StoreResult<()> {
        record.touch(RecordTimestamp::now());
        let bytes = serde_json::to_vec(&record.to_json())?;
        write_atomic(&self.cache_path(id), &bytes)?;
        debug!("Wrote cache record {}", id);
        Ok(())
    }

    // ── Discovery records ────────────────────────────────────────

    pub fn discovery_path(&self, id: &RegEntityId) -> PathBuf {
        record_path(&self.config.device_dir, id)
    }

    pub fn load_discovery(&self, id: &RegEntityId) -> StoreResult<Option<DiscoveryRecord>> {
        let file: Option<DiscoveryFile> = read_json(&self.discovery_path(id))?;
        Ok(file.map(|f| f.discovery))
    }

    pub fn write_discovery(&self, id: &RegEntityId, record: DiscoveryRecord) -> StoreResult<()> {
        let bytes = to_pretty(&DiscoveryFile::from(record))?;
        write_atomic(&self.discovery_path(id), &bytes)?;
        debug!("Wrote discovery record {}", id);
        Ok(())
    }

    // ── Summary record ───────────────────────────────────────────

    pub fn summary_path(&self) -> &Path {
        &self.config.summary_path
    }

    /// Overwrites the summary record with the empty template.
    pub fn init_summary(&self) -> StoreResult<()> {
        self.save_summary(&SummaryRecord::template())?;
        debug!("Initialized {}", self.config.summary_path.display());
        Ok(())
    }

    /// Loads the summary record, re-reading up to `load_retry` more times
    /// if the file does not parse.
    pub fn load_summary(&self) -> StoreResult<SummaryRecord> {
        let path = &self.config.summary_path;
        let attempts = self.config.load_retry + 1;
        for attempt in 1..=attempts {
            let bytes = fs::read(path)?;
            match serde_json::from_slice(&bytes) {
                Ok(summary) => return Ok(summary),
                Err(e) => warn!(
                    "Could not load summary record {} (attempt {}/{}): {}",
                    path.display(),
                    attempt,
                    attempts,
                    e
                ),
            }
        }
        Err(StoreError::LoadFailed {
            path: path.clone(),
            attempts,
        })
    }

    pub fn save_summary(&self, summary: &SummaryRecord) -> StoreResult<()> {
        let bytes = to_pretty(summary)?;
        write_atomic(&self.config.summary_path, &bytes)
    }

    /// Load, modify, save.
    pub fn update_summary<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut SummaryRecord),
    {
        let mut summary = self.load_summary()?;
        f(&mut summary);
        self.save_summary(&summary)
    }
}

fn record_path(dir: &Path, id: &RegEntityId) -> PathBuf {
    dir.join(format!("{id}.json"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn to_pretty<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
