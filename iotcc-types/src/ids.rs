//! Identifier types used throughout the connector.
//!
//! Two identifier spaces exist: the local id an entity carries before it is
//! registered, and the server-assigned uuid that becomes the golden
//! identifier for every later operation. Neither is required to be a
//! well-formed UUID on the wire, so both wrap plain strings.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable local identifier assigned to an entity before registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalId(String);

impl LocalId {
    /// Generates a fresh random local id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing local id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LocalId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for LocalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Server-assigned identifier of a registered entity.
///
/// The control center answers "null" (or nothing) when it refuses to grant
/// an identifier; [`RegEntityId::parse`] rejects both.
///
/// The id names record files on disk, so it must be a single plain path
/// component. Deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegEntityId(String);

impl RegEntityId {
    /// Parses a server uuid, rejecting empty and `"null"` values and
    /// anything that is not usable as a file name.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Err(Error::EmptyIdentifier);
        }
        if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\', '\0']) {
            return Err(Error::InvalidIdentifier(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RegEntityId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RegEntityId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RegEntityId> for String {
    fn from(id: RegEntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for RegEntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
