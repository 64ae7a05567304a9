//! Validated pattern identifiers.
//!
//! Identifiers come straight from the browser and become file names, so every
//! storage backend takes a [`PatternId`] rather than a raw string.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use std::borrow::Borrow;
use std::fmt;

/// A pattern identifier that is safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PatternId(String);

impl PatternId {
    /// Validate `raw` and wrap it.
    ///
    /// Rejects empty names, `.`/`..`, path separators (`/`, `\`), drive or
    /// stream separators (`:`), the `..` sequence anywhere, NUL and other
    /// control characters, and names longer than [`SyncConfig::MAX_ID_LEN`].
    pub fn parse(raw: &str) -> Result<Self> {
        let reject = |reason: &'static str| SyncError::InvalidIdentifier {
            id: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(reject("is empty"));
        }
        if raw == "." || raw.contains("..") {
            return Err(reject("contains a traversal sequence"));
        }
        if raw.contains(['/', '\\']) {
            return Err(reject("contains a path separator"));
        }
        if raw.contains(':') {
            return Err(reject("contains ':'"));
        }
        if raw.chars().any(|c| c.is_ascii_control()) {
            return Err(reject("contains a control character"));
        }
        if raw.len() > SyncConfig::MAX_ID_LEN {
            return Err(reject("is too long"));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for this identifier's record.
    pub fn file_name(&self, suffix: &str) -> String {
        format!("{}{}", self.0, suffix)
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Lets maps keyed by `PatternId` be queried with `&str`.
impl Borrow<str> for PatternId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PatternId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
