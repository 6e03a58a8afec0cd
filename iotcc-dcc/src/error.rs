//! Error types for the registration core.

use iotcc_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Result type for connector operations.
pub type DccResult<T> = Result<T, DccError>;

/// Errors surfaced by the connector.
///
/// Local record failures are normally logged and swallowed inside the
/// registration flow; `Store` only escapes from construction and from the
/// explicit record accessors.
#[derive(Debug, Error)]
pub enum DccError {
    /// No matching response arrived within the budget.
    #[error("no {expected} received within {timeout:?}")]
    CorrelationTimeout {
        expected: &'static str,
        timeout: Duration,
    },

    /// The control center answered but granted no identifier.
    #[error("registration of {0} failed: no identifier granted")]
    RegistrationFailure(String),

    /// A relationship was requested between incompatible registrations.
    #[error("invalid relationship: {0}")]
    InvalidRelationship(String),

    /// The transport refused the payload.
    #[error("transport error: {0}")]
    Transport(String),

    /// The background receiver dropped its end of the inbox.
    #[error("inbox closed")]
    InboxClosed,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Local record store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
