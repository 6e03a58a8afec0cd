//! Entities as known upstream of registration.
//!
//! An [`Entity`] is either the single edge system this connector runs on or
//! one of the devices attached to it. A [`Metric`] is a measurement stream
//! hanging off either of them; it never gets an identifier of its own.

use crate::ids::LocalId;
use crate::unit::Unit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind name the control center expects for an edge system.
pub const EDGE_SYSTEM_WIRE_KIND: &str = "HelixGateway";

const EDGE_SYSTEM_KIND: &str = "EdgeSystem";

/// The kind of a registrable entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// The edge system (gateway) itself.
    EdgeSystem,
    /// A device of an arbitrary vendor kind, e.g. `"LM35"`.
    Device(String),
}

impl EntityType {
    /// Creates a device type.
    pub fn device(kind: impl Into<String>) -> Self {
        Self::Device(kind.into())
    }

    /// Maps a kind string back to an entity type. Both the local and the
    /// wire spelling of the edge-system kind are recognized.
    pub fn from_kind(kind: &str) -> Self {
        match kind {
            EDGE_SYSTEM_KIND | EDGE_SYSTEM_WIRE_KIND => Self::EdgeSystem,
            other => Self::Device(other.to_string()),
        }
    }

    /// The kind name sent on the wire.
    pub fn wire_kind(&self) -> &str {
        match self {
            Self::EdgeSystem => EDGE_SYSTEM_WIRE_KIND,
            Self::Device(kind) => kind,
        }
    }

    /// The device kind, if this is a device.
    pub fn device_type(&self) -> Option<&str> {
        match self {
            Self::EdgeSystem => None,
            Self::Device(kind) => Some(kind),
        }
    }

    /// Returns true for the edge system.
    pub fn is_edge_system(&self) -> bool {
        matches!(self, Self::EdgeSystem)
    }

    /// The record category this entity is cached under.
    pub fn category(&self) -> EntityCategory {
        match self {
            Self::EdgeSystem => EntityCategory::EdgeSystem,
            Self::Device(_) => EntityCategory::Devices,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EdgeSystem => f.write_str(EDGE_SYSTEM_KIND),
            Self::Device(kind) => f.write_str(kind),
        }
    }
}

/// Category stored in the `entity type` field of a cache record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    EdgeSystem,
    Devices,
}

impl EntityCategory {
    /// The string stored in the record.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EdgeSystem => "EdgeSystem",
            Self::Devices => "Devices",
        }
    }
}

impl fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An edge system or device prior to registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Local identifier, echoed back by the server on registration.
    pub entity_id: LocalId,
    /// Display name.
    pub name: String,
    /// Edge system or device kind.
    pub entity_type: EntityType,
}

impl Entity {
    /// Creates an entity with a freshly generated local id.
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            entity_id: LocalId::generate(),
            name: name.into(),
            entity_type,
        }
    }

    /// Creates the edge system entity.
    pub fn edge_system(name: impl Into<String>) -> Self {
        Self::new(name, EntityType::EdgeSystem)
    }

    /// Creates a device entity of the given kind.
    pub fn device(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(name, EntityType::device(kind))
    }

    /// Replaces the generated local id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<LocalId>) -> Self {
        self.entity_id = id.into();
        self
    }
}

/// A measurement stream to be attached to a registered entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Stat key under which samples are published.
    pub name: String,
    /// Declared measurement unit.
    pub unit: Option<Unit>,
}

impl Metric {
    /// Creates a unitless metric.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
        }
    }

    /// Sets the measurement unit.
    #[must_use]
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }
}
