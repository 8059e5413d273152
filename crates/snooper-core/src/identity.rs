//! Static machine identity and identifier masking.

use std::fmt;

use serde::{Serialize, Serializer};

/// Placeholder rendered for fields the host would not reveal.
pub const UNAVAILABLE: &str = "<unavailable>";

/// Character substituted for redacted identifier characters.
pub const MASK_CHAR: char = '*';

/// Number of trailing characters left visible by [`mask`].
const VISIBLE_SUFFIX: usize = 4;

/// A string identity field that is either known or explicitly unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityField {
    Value(String),
    #[default]
    Unavailable,
}

impl IdentityField {
    /// Wrap an optional reading; blank strings count as unavailable.
    pub fn from_option(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Self::Value(v.trim().to_string()),
            _ => Self::Unavailable,
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Redacted copy. The unavailable placeholder is never masked.
    pub fn masked(&self) -> Self {
        match self {
            Self::Value(v) => Self::Value(mask(v)),
            Self::Unavailable => Self::Unavailable,
        }
    }
}

impl From<&str> for IdentityField {
    fn from(v: &str) -> Self {
        Self::from_option(Some(v.to_string()))
    }
}

impl fmt::Display for IdentityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_deref().unwrap_or(UNAVAILABLE))
    }
}

impl Serialize for IdentityField {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => s.serialize_str(v),
            Self::Unavailable => s.serialize_none(),
        }
    }
}

/// Hide all but the last four characters of an identifier.
///
/// Values of four characters or fewer are returned unchanged. Length is
/// preserved, counted in characters.
pub fn mask(value: &str) -> String {
    let len = value.chars().count();
    if len <= VISIBLE_SUFFIX {
        return value.to_string();
    }
    value
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if i < len - VISIBLE_SUFFIX {
                MASK_CHAR
            } else {
                c
            }
        })
        .collect()
}

/// Static hardware identity, loaded once per orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentitySnapshot {
    pub model: IdentityField,
    pub architecture: IdentityField,
    pub physical_cores: u32,
    pub logical_cores: u32,
    pub board_id: IdentityField,
    pub product_name: IdentityField,
    pub serial_number: IdentityField,
    pub hardware_uuid: IdentityField,
}

impl IdentitySnapshot {
    /// Copy with serial number and hardware UUID redacted. Other fields are
    /// never masked.
    pub fn masked(&self) -> Self {
        Self {
            serial_number: self.serial_number.masked(),
            hardware_uuid: self.hardware_uuid.masked(),
            ..self.clone()
        }
    }

    /// Apply the reveal policy: masked unless `reveal_identifiers` is set.
    pub fn with_policy(self, reveal_identifiers: bool) -> Self {
        if reveal_identifiers {
            self
        } else {
            self.masked()
        }
    }
}
