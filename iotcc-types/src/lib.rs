//! Core type definitions for the IoTCC connector.
//!
//! This crate defines the types shared by the record store and the
//! registration engine:
//! - Local and server-assigned entity identifiers
//! - Edge systems, devices and metrics as known before registration
//! - Record timestamps and UTC millisecond clocks
//! - SI unit parsing for metric unit publication
//!
//! Nothing here talks to the network or the file system.

mod entity;
mod ids;
mod timestamp;
mod unit;

use std::collections::BTreeMap;

pub use entity::{Entity, EntityCategory, EntityType, Metric, EDGE_SYSTEM_WIRE_KIND};
pub use ids::{LocalId, RegEntityId};
pub use timestamp::{utc_millis, RecordTimestamp, RECORD_TIME_FORMAT};
pub use unit::{SiPrefix, Unit};

/// A flat property map as exchanged with the control center.
pub type Properties = BTreeMap<String, String>;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("empty identifier")]
    EmptyIdentifier,

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid unit: {0}")]
    InvalidUnit(String),
}
