//! The summary record (`iotcc.json`): which edge system this host is and
//! which devices hang off it.

use iotcc_types::{LocalId, RegEntityId};
use serde::{Deserialize, Serialize};

/// The single edge system entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSystemEntry {
    #[serde(rename = "EntityType")]
    pub entity_type: String,
    #[serde(rename = "LocalUuid")]
    pub local_uuid: String,
    #[serde(rename = "SystemName")]
    pub system_name: String,
    pub uuid: String,
}

/// One known device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    #[serde(rename = "DeviceName")]
    pub device_name: String,
    #[serde(rename = "EntityType")]
    pub entity_type: String,
    #[serde(rename = "LocalUuid")]
    pub local_uuid: String,
    pub uuid: String,
}

impl DeviceEntry {
    pub fn new(name: &str, entity_type: &str, uuid: &RegEntityId, local_id: &LocalId) -> Self {
        Self {
            device_name: name.to_string(),
            entity_type: entity_type.to_string(),
            local_uuid: local_id.to_string(),
            uuid: uuid.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OgProperties {
    #[serde(rename = "OrganizationGroup")]
    pub organization_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryBody {
    #[serde(rename = "Devices", default)]
    pub devices: Vec<DeviceEntry>,
    #[serde(
        rename = "EdgeSystem",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub edge_system: Option<EdgeSystemEntry>,
    #[serde(rename = "OGProperties", default)]
    pub og_properties: OgProperties,
}

/// The whole summary document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub iotcc: SummaryBody,
}

impl SummaryRecord {
    /// The template written at startup: an empty edge-system block, no devices.
    pub fn template() -> Self {
        Self {
            iotcc: SummaryBody {
                devices: Vec::new(),
                edge_system: Some(EdgeSystemEntry::default()),
                og_properties: OgProperties::default(),
            },
        }
    }

    /// The current edge system, if the block is present.
    pub fn edge_system(&self) -> Option<&EdgeSystemEntry> {
        self.iotcc.edge_system.as_ref()
    }

    pub fn devices(&self) -> &[DeviceEntry] {
        &self.iotcc.devices
    }

    /// Records the edge system, replacing any previous one.
    pub fn set_edge_system(
        &mut self,
        name: &str,
        entity_type: &str,
        uuid: &RegEntityId,
        local_id: &LocalId,
    ) {
        self.iotcc.edge_system = Some(EdgeSystemEntry {
            entity_type: entity_type.to_string(),
            local_uuid: local_id.to_string(),
            system_name: name.to_string(),
            uuid: uuid.to_string(),
        });
    }

    /// Removes the edge-system block if it names this system.
    pub fn remove_edge_system(&mut self, name: &str, uuid: &RegEntityId) -> bool {
        let matches = self
            .iotcc
            .edge_system
            .as_ref()
            .is_some_and(|es| es.system_name == name && es.uuid == uuid.as_str());
        if matches {
            self.iotcc.edge_system = None;
        }
        matches
    }

    /// Adds a device unless one with the same `(uuid, EntityType)` exists.
    pub fn upsert_device(&mut self, entry: DeviceEntry) -> bool {
        let exists = self
            .iotcc
            .devices
            .iter()
            .any(|d| d.uuid == entry.uuid && d.entity_type == entry.entity_type);
        if !exists {
            self.iotcc.devices.push(entry);
        }
        !exists
    }

    /// Removes every device entry with this uuid.
    pub fn remove_device(&mut self, uuid: &RegEntityId) -> bool {
        let before = self.iotcc.devices.len();
        self.iotcc.devices.retain(|d| d.uuid != uuid.as_str());
        self.iotcc.devices.len() != before
    }
}
