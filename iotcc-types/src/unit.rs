//! SI units attached to metrics.
//!
//! The control center shows a metric's unit as two properties, a prefix and
//! a unit name (`"kilo"` + `"watt"`). Units are parsed from their spelled-out
//! names: `"kilowatt"`, `"millimetre"`, `"degC"`.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal SI prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiPrefix {
    Yotta,
    Zetta,
    Exa,
    Peta,
    Tera,
    Giga,
    Mega,
    Kilo,
    Hecto,
    Deca,
    Deci,
    Centi,
    Milli,
    Micro,
    Nano,
    Pico,
    Femto,
    Atto,
    Zepto,
    Yocto,
}

impl SiPrefix {
    /// Every prefix, largest first.
    pub const ALL: [SiPrefix; 20] = [
        Self::Yotta,
        Self::Zetta,
        Self::Exa,
        Self::Peta,
        Self::Tera,
        Self::Giga,
        Self::Mega,
        Self::Kilo,
        Self::Hecto,
        Self::Deca,
        Self::Deci,
        Self::Centi,
        Self::Milli,
        Self::Micro,
        Self::Nano,
        Self::Pico,
        Self::Femto,
        Self::Atto,
        Self::Zepto,
        Self::Yocto,
    ];

    /// Lower-case prefix name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Yotta => "yotta",
            Self::Zetta => "zetta",
            Self::Exa => "exa",
            Self::Peta => "peta",
            Self::Tera => "tera",
            Self::Giga => "giga",
            Self::Mega => "mega",
            Self::Kilo => "kilo",
            Self::Hecto => "hecto",
            Self::Deca => "deca",
            Self::Deci => "deci",
            Self::Centi => "centi",
            Self::Milli => "milli",
            Self::Micro => "micro",
            Self::Nano => "nano",
            Self::Pico => "pico",
            Self::Femto => "femto",
            Self::Atto => "atto",
            Self::Zepto => "zepto",
            Self::Yocto => "yocto",
        }
    }

    /// Base-10 exponent of the prefix.
    pub const fn exponent(&self) -> i32 {
        match self {
            Self::Yotta => 24,
            Self::Zetta => 21,
            Self::Exa => 18,
            Self::Peta => 15,
            Self::Tera => 12,
            Self::Giga => 9,
            Self::Mega => 6,
            Self::Kilo => 3,
            Self::Hecto => 2,
            Self::Deca => 1,
            Self::Deci => -1,
            Self::Centi => -2,
            Self::Milli => -3,
            Self::Micro => -6,
            Self::Nano => -9,
            Self::Pico => -12,
            Self::Femto => -15,
            Self::Atto => -18,
            Self::Zepto => -21,
            Self::Yocto => -24,
        }
    }
}

impl fmt::Display for SiPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A measurement unit: an optional SI prefix and a unit name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    prefix: Option<SiPrefix>,
    name: String,
}

impl Unit {
    /// Creates a unit from its parts.
    pub fn new(prefix: Option<SiPrefix>, name: impl Into<String>) -> Self {
        Self {
            prefix,
            name: name.into(),
        }
    }

    /// Parses a spelled-out unit such as `"kilowatt"`.
    ///
    /// A leading prefix is split off only when something remains after it,
    /// so `"kilo"` on its own is a unit name, not a bare prefix.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidUnit("empty unit".into()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(Error::InvalidUnit(trimmed.to_string()));
        }

        let lower = trimmed.to_ascii_lowercase();
        for prefix in SiPrefix::ALL {
            if let Some(rest) = lower.strip_prefix(prefix.name()) {
                if !rest.is_empty() {
                    let name = &trimmed[prefix.name().len()..];
                    return Ok(Self::new(Some(prefix), name));
                }
            }
        }
        Ok(Self::new(None, trimmed))
    }

    /// The SI prefix, if any.
    pub fn prefix(&self) -> Option<SiPrefix> {
        self.prefix
    }

    /// The unit name without its prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prefix name, or an empty string for unprefixed units.
    pub fn prefix_name(&self) -> &'static str {
        self.prefix.map(|p| p.name()).unwrap_or("")
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix_name(), self.name)
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
