//! Version identifiers for pushed sketches
//!
//! A `VersionId` names one staging directory under `inbox/`. Because it is
//! joined onto filesystem paths, it is validated once at construction and is
//! immutable afterwards: every `VersionId` in the system is known to be a
//! single, non-hidden path component that cannot collide with the store's
//! own directories.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{Result, WallmountError};

/// Maximum identifier length in bytes
pub const MAX_VERSION_ID_LEN: usize = 128;

/// Names used by the store's own layout
pub const RESERVED_NAMES: &[&str] = &["inbox", "static", "sketch"];

/// Opaque, sanitized identifier of one pushed content set
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId(String);

impl VersionId {
    /// Validate and wrap a raw identifier
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(WallmountError::invalid_identifier(raw, "empty identifier"));
        }
        if raw.len() > MAX_VERSION_ID_LEN {
            return Err(WallmountError::invalid_identifier(
                raw,
                format!("longer than {} bytes", MAX_VERSION_ID_LEN),
            ));
        }
        if raw.starts_with('.') {
            return Err(WallmountError::invalid_identifier(
                raw,
                "must not start with '.'",
            ));
        }
        if let Some(bad) = raw.chars().find(|c| !is_allowed_char(*c)) {
            return Err(WallmountError::invalid_identifier(
                raw,
                format!("character {:?} is not allowed", bad),
            ));
        }
        if RESERVED_NAMES.contains(&raw) {
            return Err(WallmountError::invalid_identifier(raw, "reserved name"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VersionId {
    type Err = WallmountError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
