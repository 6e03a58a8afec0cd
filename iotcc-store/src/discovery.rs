//! Discovery records, consumed by the device-management agent.
//!
//! ```json
//! {
//!     "discovery": {
//!         "remove": false,
//!         "attributes": [
//!             {"IoTDeviceType": "LM35"},
//!             {"IoTDeviceName": "LM35-12345"},
//!             {"model": "LM35-A2"},
//!             {"LastSeenTimestamp": "2016-11-04T10:00:00"}
//!         ]
//!     }
//! }
//! ```
//!
//! Edge systems lead with `{"edge system name": ...}` instead of the two
//! device keys. Property attributes vary; the trailing timestamp does not.

use crate::cache::{is_reserved_key, CacheRecord};
use iotcc_types::RecordTimestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ATTR_EDGE_SYSTEM_NAME: &str = "edge system name";
pub const ATTR_DEVICE_TYPE: &str = "IoTDeviceType";
pub const ATTR_DEVICE_NAME: &str = "IoTDeviceName";
pub const ATTR_LAST_SEEN: &str = "LastSeenTimestamp";

/// A single `{key: value}` attribute.
pub type Attribute = BTreeMap<String, String>;

fn attribute(key: &str, value: impl Into<String>) -> Attribute {
    let mut attr = Attribute::new();
    attr.insert(key.to_string(), value.into());
    attr
}

/// On-disk envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryFile {
    pub discovery: DiscoveryRecord,
}

/// Presentation-oriented view of a cache record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    pub remove: bool,
    pub attributes: Vec<Attribute>,
}

impl DiscoveryRecord {
    /// Edge-system flavor.
    pub fn edge_system(name: &str, record: Option<&CacheRecord>, remove: bool) -> Self {
        Self::build(vec![attribute(ATTR_EDGE_SYSTEM_NAME, name)], record, remove)
    }

    /// Device flavor. An unknown device type is written as an empty string.
    pub fn device(
        name: &str,
        device_type: Option<&str>,
        record: Option<&CacheRecord>,
        remove: bool,
    ) -> Self {
        Self::build(
            vec![
                attribute(ATTR_DEVICE_TYPE, device_type.unwrap_or_default()),
                attribute(ATTR_DEVICE_NAME, name),
            ],
            record,
            remove,
        )
    }

    fn build(mut attributes: Vec<Attribute>, record: Option<&CacheRecord>, remove: bool) -> Self {
        if let Some(record) = record {
            attributes.extend(
                record
                    .fields()
                    .iter()
                    .filter(|(k, _)| !is_reserved_key(k))
                    .map(|(k, v)| attribute(k, v.clone())),
            );
        }
        attributes.push(attribute(ATTR_LAST_SEEN, RecordTimestamp::now().to_string()));
        Self { remove, attributes }
    }

    /// The value of the leading display-name attribute.
    pub fn display_name(&self) -> Option<&str> {
        let first = self.attributes.first()?;
        if let Some(name) = first.get(ATTR_EDGE_SYSTEM_NAME) {
            return Some(name);
        }
        self.attributes
            .get(1)
            .and_then(|a| a.get(ATTR_DEVICE_NAME))
            .map(String::as_str)
    }

    /// Looks up an attribute by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find_map(|a| a.get(key))
            .map(String::as_str)
    }
}

impl From<DiscoveryRecord> for DiscoveryFile {
    fn from(discovery: DiscoveryRecord) -> Self {
        Self { discovery }
    }
}
