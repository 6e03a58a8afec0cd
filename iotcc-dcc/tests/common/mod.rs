#![allow(dead_code)]

use chrono::{DateTime, Utc};
use iotcc_dcc::transport::mock::MockTransport;
use iotcc_dcc::{inbox, ControlCenter, DccConfig};
use iotcc_store::{CacheRecord, DiscoveryRecord, SummaryRecord};
use iotcc_types::{Properties, RegEntityId};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Scripted control center.
///
/// Registrations are granted `reg-<local id>` unless overridden in `grants`.
/// Removals answer with `remove_result`; `None` stays silent. Property
/// fetches answer with `property_list`; `None` stays silent. With
/// `string_tids` the echoed `transactionID` comes back as a JSON string.
#[derive(Debug, Clone)]
pub struct MockServer {
    pub grants: HashMap<String, String>,
    pub remove_result: Option<String>,
    pub property_list: Option<Vec<Value>>,
    pub string_tids: bool,
}

impl Default for MockServer {
    fn default() -> Self {
        Self {
            grants: HashMap::new(),
            remove_result: Some("succeeded".into()),
            property_list: None,
            string_tids: false,
        }
    }
}

impl MockServer {
    pub fn granting(mut self, local_id: &str, uuid: &str) -> Self {
        self.grants.insert(local_id.into(), uuid.into());
        self
    }

    pub fn removing(mut self, result: Option<&str>) -> Self {
        self.remove_result = result.map(String::from);
        self
    }

    pub fn with_properties(mut self, list: Vec<Value>) -> Self {
        self.property_list = Some(list);
        self
    }

    pub fn echoing_string_tids(mut self) -> Self {
        self.string_tids = true;
        self
    }

    pub fn respond(&self, request: &Value) -> Vec<Value> {
        let tid = match &request["transactionID"] {
            Value::Number(n) if self.string_tids => Value::String(n.to_string()),
            other => other.clone(),
        };
        let id = request["body"]["id"].as_str().unwrap_or_default().to_string();
        match request["type"].as_str().unwrap_or_default() {
            "create_or_find_resource_request" => {
                let uuid = self
                    .grants
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| format!("reg-{id}"));
                vec![json!({
                    "type": "create_or_find_resource_response",
                    "transactionID": tid,
                    "body": {"id": id, "uuid": uuid}
                })]
            }
            "remove_resource_request" => match &self.remove_result {
                Some(result) => vec![json!({
                    "type": "remove_resource_response",
                    "transactionID": tid,
                    "body": {"id": id, "result": result}
                })],
                None => vec![],
            },
            "get_properties" => match &self.property_list {
                Some(list) => vec![json!({
                    "type": "get_properties_response",
                    "transactionID": tid,
                    "body": {"uuid": request["uuid"], "propertyList": list}
                })],
                None => vec![],
            },
            _ => vec![],
        }
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub transport: Arc<MockTransport>,
    pub cc: ControlCenter,
}

impl Harness {
    pub fn new(server: MockServer) -> Self {
        Self::build(server, |_| {}, None)
    }

    pub fn with_config(server: MockServer, tweak: impl FnOnce(&mut DccConfig)) -> Self {
        Self::build(server, tweak, None)
    }

    /// Reboot fetches enabled, boot time an hour ahead so every existing
    /// record counts as stale.
    pub fn rebooted(server: MockServer) -> Self {
        let boot = Utc::now() + chrono::Duration::hours(1);
        Self::build(server, |c| c.enable_reboot_getprop = true, Some(boot))
    }

    fn build(
        server: MockServer,
        tweak: impl FnOnce(&mut DccConfig),
        boot_time: Option<DateTime<Utc>>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DccConfig::under(dir.path());
        tweak(&mut config);
        let (tx, rx) = inbox();
        let transport = Arc::new(MockTransport::with_responder(tx, move |req| {
            server.respond(req)
        }));
        let mut cc = ControlCenter::new(transport.clone(), rx, config).unwrap();
        if let Some(boot) = boot_time {
            cc = cc.with_boot_time(boot);
        }
        Self { dir, transport, cc }
    }

    pub async fn summary(&self) -> SummaryRecord {
        self.cc.records().await.load_summary().unwrap()
    }

    pub async fn cache(&self, id: &RegEntityId) -> Option<CacheRecord> {
        self.cc.records().await.load_cache(id).unwrap()
    }

    pub async fn discovery(&self, id: &RegEntityId) -> Option<DiscoveryRecord> {
        self.cc.records().await.load_discovery(id).unwrap()
    }
}

pub fn uuid(s: &str) -> RegEntityId {
    RegEntityId::parse(s).unwrap()
}

pub fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
