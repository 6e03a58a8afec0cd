//! Control center protocol messages.
//!
//! Requests carry an even `transactionID` and a `type`; most bodies name the
//! entity by `kind`, `id` and `name`. Responses are matched structurally
//! (type plus echoed identifier), not by transaction id, because the server
//! does not echo it reliably.

use iotcc_types::{Entity, Properties, RegEntityId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const CREATE_OR_FIND_RESOURCE_REQUEST: &str = "create_or_find_resource_request";
pub const CREATE_OR_FIND_RESOURCE_RESPONSE: &str = "create_or_find_resource_response";
pub const REMOVE_RESOURCE_REQUEST: &str = "remove_resource_request";
pub const REMOVE_RESOURCE_RESPONSE: &str = "remove_resource_response";
pub const CREATE_RELATIONSHIP_REQUEST: &str = "create_relationship_request";
pub const ADD_PROPERTIES: &str = "add_properties";
pub const GET_PROPERTIES: &str = "get_properties";
pub const GET_PROPERTIES_RESPONSE: &str = "get_properties_response";
pub const ADD_STATS: &str = "add_stats";

/// Result string the server uses for success.
pub const RESULT_SUCCEEDED: &str = "succeeded";

/// Transaction identifier. Always even; odd values belong to the session
/// protocol underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(u32);

impl TransactionId {
    /// Scales a raw counter value into the even id space.
    pub const fn from_counter(counter: u32) -> Self {
        Self((counter & 0x00FF_FFFF) * 2)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Outbound ─────────────────────────────────────────────────────

/// `kind`/`id`/`name` triple naming an entity on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: String,
    pub id: String,
    pub name: String,
}

impl From<&Entity> for ResourceRef {
    fn from(entity: &Entity) -> Self {
        Self {
            kind: entity.entity_type.wire_kind().to_string(),
            id: entity.entity_id.to_string(),
            name: entity.name.clone(),
        }
    }
}

/// Register (or look up) a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrFindResourceRequest {
    #[serde(rename = "transactionID")]
    pub transaction_id: TransactionId,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub body: ResourceRef,
}

impl CreateOrFindResourceRequest {
    pub fn new(transaction_id: TransactionId, entity: &Entity) -> Self {
        Self {
            transaction_id,
            msg_type: CREATE_OR_FIND_RESOURCE_REQUEST.into(),
            body: entity.into(),
        }
    }
}

/// Remove a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResourceRequest {
    #[serde(rename = "transactionID")]
    pub transaction_id: TransactionId,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub body: ResourceRef,
}

impl RemoveResourceRequest {
    pub fn new(transaction_id: TransactionId, entity: &Entity) -> Self {
        Self {
            transaction_id,
            msg_type: REMOVE_RESOURCE_REQUEST.into(),
            body: entity.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipBody {
    pub parent: String,
    pub child: String,
}

/// Link a child resource to its parent. Not acknowledged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRelationshipRequest {
    #[serde(rename = "transactionID")]
    pub transaction_id: TransactionId,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub body: RelationshipBody,
}

impl CreateRelationshipRequest {
    pub fn new(transaction_id: TransactionId, parent: &RegEntityId, child: &RegEntityId) -> Self {
        Self {
            transaction_id,
            msg_type: CREATE_RELATIONSHIP_REQUEST.into(),
            body: RelationshipBody {
                parent: parent.to_string(),
                child: child.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDatum {
    #[serde(rename = "propertyKey")]
    pub key: String,
    #[serde(rename = "propertyValue")]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertiesBody {
    pub kind: String,
    pub id: String,
    pub name: String,
    pub timestamp: i64,
    pub property_data: Vec<PropertyDatum>,
}

/// Add or overwrite properties on a resource. Not acknowledged.
///
/// The id key is spelled `transationID`; deployed servers expect it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddPropertiesMessage {
    #[serde(rename = "transationID")]
    pub transaction_id: TransactionId,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub body: PropertiesBody,
}

impl AddPropertiesMessage {
    pub fn new(
        transaction_id: TransactionId,
        entity: &Entity,
        timestamp: i64,
        properties: &Properties,
    ) -> Self {
        let ResourceRef { kind, id, name } = entity.into();
        Self {
            transaction_id,
            msg_type: ADD_PROPERTIES.into(),
            body: PropertiesBody {
                kind,
                id,
                name,
                timestamp,
                property_data: properties
                    .iter()
                    .map(|(k, v)| PropertyDatum {
                        key: k.clone(),
                        value: v.clone(),
                    })
                    .collect(),
            },
        }
    }
}

/// Fetch the server's property list for a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPropertiesRequest {
    #[serde(rename = "transactionID")]
    pub transaction_id: TransactionId,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub uuid: String,
}

impl GetPropertiesRequest {
    pub fn new(transaction_id: TransactionId, uuid: &RegEntityId) -> Self {
        Self {
            transaction_id,
            msg_type: GET_PROPERTIES.into(),
            uuid: uuid.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBatch {
    #[serde(rename = "statKey")]
    pub stat_key: String,
    pub timestamps: Vec<i64>,
    pub data: Vec<f64>,
}

/// A batch of metric samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddStatsMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub body: ResourceRef,
    pub metric_data: Vec<StatBatch>,
}

impl AddStatsMessage {
    pub fn new(parent: &Entity, stat_key: &str, timestamps: Vec<i64>, data: Vec<f64>) -> Self {
        Self {
            msg_type: ADD_STATS.into(),
            body: parent.into(),
            metric_data: vec![StatBatch {
                stat_key: stat_key.to_string(),
                timestamps,
                data,
            }],
        }
    }
}

// ── Inbound ──────────────────────────────────────────────────────

/// Any message pulled from the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Informational only. Servers echo it in varying shapes, if at all.
    #[serde(rename = "transactionID", default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Value>,
    #[serde(default)]
    pub body: Value,
}

impl InboundMessage {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn is(&self, msg_type: &str) -> bool {
        self.msg_type == msg_type
    }

    /// A string field of the body. JSON `null` and non-strings are `None`.
    pub fn body_str(&self, key: &str) -> Option<&str> {
        self.body.get(key).and_then(Value::as_str)
    }

    /// The body's `uuid`, unless absent or the literal `"null"`.
    pub fn granted_uuid(&self) -> Option<&str> {
        self.body_str("uuid").filter(|u| *u != "null")
    }

    /// Whether `body.result` reports success.
    pub fn succeeded(&self) -> bool {
        self.body_str("result") == Some(RESULT_SUCCEEDED)
    }

    /// The body's `propertyList`, as a list of `{key: value}` maps.
    /// Non-string values keep their JSON text.
    pub fn property_list(&self) -> Option<Vec<Properties>> {
        let items = self.body.get("propertyList")?.as_array()?;
        let list = items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), v)
                    })
                    .collect()
            })
            .collect();
        Some(list)
    }
}
