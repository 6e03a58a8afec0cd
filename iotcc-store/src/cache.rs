//! Cache records: the last-known property set of one registered entity.
//!
//! A cache record is a flat string map. Four keys are reserved: the identity
//! fields `entity type`, `name` and `device type`, and `Entity_Timestamp`
//! (last write time). Everything else is a property.

use iotcc_types::{EntityCategory, Properties, RecordTimestamp};
use serde_json::{Map, Value};

pub const KEY_ENTITY_TYPE: &str = "entity type";
pub const KEY_NAME: &str = "name";
pub const KEY_DEVICE_TYPE: &str = "device type";
pub const KEY_TIMESTAMP: &str = "Entity_Timestamp";

/// Remote keys containing this marker are never merged into a cache record.
pub const SYSTEM_PROPERTIES_MARKER: &str = "System Properties|";

/// Returns true for keys that are not properties.
pub fn is_reserved_key(key: &str) -> bool {
    matches!(key, KEY_ENTITY_TYPE | KEY_NAME | KEY_DEVICE_TYPE | KEY_TIMESTAMP)
}

/// The identity a cache record must match to be considered the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordIdentity<'a> {
    pub category: EntityCategory,
    pub name: &'a str,
    pub device_type: Option<&'a str>,
}

impl<'a> RecordIdentity<'a> {
    pub fn new(category: EntityCategory, name: &'a str, device_type: Option<&'a str>) -> Self {
        Self {
            category,
            name,
            device_type,
        }
    }
}

/// One entity's cached record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheRecord {
    fields: Properties,
}

impl CacheRecord {
    /// Builds a fresh record from an identity and optional properties.
    pub fn fresh(identity: RecordIdentity<'_>, properties: Option<&Properties>) -> Self {
        let mut fields = Properties::new();
        fields.insert(KEY_ENTITY_TYPE.into(), identity.category.as_str().into());
        fields.insert(KEY_NAME.into(), identity.name.into());
        fields.insert(
            KEY_DEVICE_TYPE.into(),
            identity.device_type.unwrap_or_default().into(),
        );
        let mut record = Self { fields };
        if let Some(props) = properties {
            record.merge(props);
        }
        record
    }

    /// Wraps an already-flat field map.
    pub fn from_fields(fields: Properties) -> Self {
        Self { fields }
    }

    /// Converts a parsed JSON object. Non-string values keep their JSON text.
    pub fn from_json(map: Map<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();
        Self { fields }
    }

    /// All fields including the reserved ones.
    pub fn fields(&self) -> &Properties {
        &self.fields
    }

    /// Properties only, reserved keys excluded.
    pub fn properties(&self) -> impl Iterator<Item = (&String, &String)> {
        self.fields.iter().filter(|(k, _)| !is_reserved_key(k))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn entity_type(&self) -> Option<&str> {
        self.get(KEY_ENTITY_TYPE)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(KEY_NAME)
    }

    pub fn device_type(&self) -> Option<&str> {
        self.get(KEY_DEVICE_TYPE)
    }

    /// Last write time. `None` if absent; `Some(Err)` if unparseable.
    pub fn timestamp(&self) -> Option<Result<RecordTimestamp, iotcc_types::Error>> {
        self.get(KEY_TIMESTAMP).map(RecordTimestamp::parse)
    }

    /// Stamps the record with the given write time.
    pub fn touch(&mut self, at: RecordTimestamp) {
        self.fields.insert(KEY_TIMESTAMP.into(), at.to_string());
    }

    /// Overlays properties; incoming values win.
    pub fn merge(&mut self, properties: &Properties) {
        for (k, v) in properties {
            self.fields.insert(k.clone(), v.clone());
        }
    }

    /// Overlays a remote property list, skipping system-property keys.
    pub fn merge_remote(&mut self, items: &[Properties]) {
        for item in items {
            for (k, v) in item {
                if k.contains(SYSTEM_PROPERTIES_MARKER) {
                    continue;
                }
                self.fields.insert(k.clone(), v.clone());
            }
        }
    }

    /// Whether the stored identity fields describe the given entity.
    ///
    /// A stored empty device type is equivalent to an absent one.
    pub fn matches_identity(&self, identity: &RecordIdentity<'_>) -> bool {
        let type_matches = self.entity_type() == Some(identity.category.as_str());
        let name_matches = self.name() == Some(identity.name);
        let device_matches = match (self.device_type(), identity.device_type) {
            (Some(stored), Some(live)) => stored == live,
            (Some(stored), None) => stored.is_empty(),
            (None, _) => false,
        };
        type_matches && name_matches && device_matches
    }

    /// JSON object form, as written to disk.
    pub fn to_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

/// Reconciles a stored record with a live entity and incoming properties.
///
/// `remote` is the authoritative property list fetched after a reboot, if one
/// was fetched. It is merged into the stored record before the identity
/// check. A record whose identity no longer matches is dropped wholesale.
/// The result is not stamped; the writer stamps it.
pub fn reconcile(
    stored: Option<CacheRecord>,
    remote: Option<&[Properties]>,
    identity: RecordIdentity<'_>,
    incoming: Option<&Properties>,
) -> CacheRecord {
    let Some(mut record) = stored else {
        return CacheRecord::fresh(identity, incoming);
    };

    if let Some(items) = remote {
        record.merge_remote(items);
    }

    if record.matches_identity(&identity) {
        if let Some(props) = incoming {
            record.merge(props);
        }
        record
    } else {
        CacheRecord::fresh(identity, incoming)
    }
}
