use iotcc_cli::{
    load_config, reset_summary, show_discovery, show_entity, show_summary, Overrides,
};
use iotcc_store::{
    CacheRecord, DiscoveryRecord, RecordIdentity, RecordStore, StoreConfig, SummaryRecord,
};
use iotcc_types::{EntityCategory, LocalId, RegEntityId};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

fn seeded() -> (TempDir, StoreConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::under(dir.path());
    let store = RecordStore::open(config.clone()).unwrap();
    let id = RegEntityId::parse("U1").unwrap();

    store.init_summary().unwrap();
    store
        .update_summary(|s| s.set_edge_system("gw-1", "HelixGateway", &id, &LocalId::new("local")))
        .unwrap();

    let identity = RecordIdentity::new(EntityCategory::EdgeSystem, "gw-1", None);
    let mut record = CacheRecord::fresh(identity, None);
    store.save_cache(&id, &mut record).unwrap();
    store
        .write_discovery(&id, DiscoveryRecord::edge_system("gw-1", Some(&record), false))
        .unwrap();

    (dir, config)
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn no_config_file_uses_defaults() {
    let config = load_config(None).unwrap();
    assert_eq!(config.iotcc_load_retry, 3);
}

#[test]
fn overrides_replace_only_given_paths() {
    let base = StoreConfig::under("/base");
    let applied = Overrides {
        entity_dir: Some("/elsewhere".into()),
        ..Default::default()
    }
    .apply(base.clone());

    assert_eq!(applied.entity_dir, std::path::PathBuf::from("/elsewhere"));
    assert_eq!(applied.device_dir, base.device_dir);
    assert_eq!(applied.summary_path, base.summary_path);
}

// ── Commands ────────────────────────────────────────────────────

#[test]
fn summary_prints_edge_system() {
    let (_dir, config) = seeded();
    let out: Value = serde_json::from_str(&show_summary(config).unwrap()).unwrap();
    assert_eq!(out["iotcc"]["EdgeSystem"]["SystemName"], "gw-1");
    assert_eq!(out["iotcc"]["EdgeSystem"]["uuid"], "U1");
}

#[test]
fn entity_prints_cache_record() {
    let (_dir, config) = seeded();
    let out: Value = serde_json::from_str(&show_entity(config, "U1").unwrap()).unwrap();
    assert_eq!(out["entity type"], "EdgeSystem");
    assert_eq!(out["name"], "gw-1");
}

#[test]
fn discovery_prints_envelope() {
    let (_dir, config) = seeded();
    let out: Value = serde_json::from_str(&show_discovery(config, "U1").unwrap()).unwrap();
    assert_eq!(out["discovery"]["remove"], false);
    assert_eq!(out["discovery"]["attributes"][0]["edge system name"], "gw-1");
}

#[test]
fn missing_records_are_errors() {
    let (_dir, config) = seeded();
    assert!(show_entity(config.clone(), "nope").is_err());
    assert!(show_discovery(config.clone(), "nope").is_err());
    assert!(show_entity(config, "null").is_err());
}

#[test]
fn reads_create_no_directories() {
    let (dir, mut config) = seeded();
    config.entity_dir = dir.path().join("missing/entity");
    config.device_dir = dir.path().join("missing/devices");

    let out: Value = serde_json::from_str(&show_summary(config.clone()).unwrap()).unwrap();
    assert_eq!(out["iotcc"]["EdgeSystem"]["uuid"], "U1");
    assert!(show_entity(config.clone(), "U1").is_err());
    assert!(show_discovery(config, "U1").is_err());
    assert!(!dir.path().join("missing").exists());
}

#[cfg(unix)]
#[test]
fn summary_reads_despite_unwritable_record_dirs() {
    let (_dir, mut config) = seeded();
    config.entity_dir = "/proc/iotcc/entity".into();
    config.device_dir = "/proc/iotcc/devices".into();

    let out: Value = serde_json::from_str(&show_summary(config).unwrap()).unwrap();
    assert_eq!(out["iotcc"]["EdgeSystem"]["SystemName"], "gw-1");
}

#[test]
fn reset_creates_only_the_summary_parent() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StoreConfig::under(dir.path().join("records"));
    config.summary_path = dir.path().join("state/iotcc.json");

    reset_summary(config.clone()).unwrap();

    assert!(config.summary_path.is_file());
    assert!(!dir.path().join("records").exists());
    let store = RecordStore::open_existing(config);
    assert_eq!(store.load_summary().unwrap(), SummaryRecord::template());
}

#[test]
fn reset_restores_template() {
    let (_dir, config) = seeded();
    reset_summary(config.clone()).unwrap();

    let store = RecordStore::open(config).unwrap();
    assert_eq!(store.load_summary().unwrap(), SummaryRecord::template());
}
