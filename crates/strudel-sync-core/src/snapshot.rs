//! Snapshot envelope: extracting the pattern map from a sync payload.
//!
//! The browser posts its whole `localStorage`, where Strudel keeps the user
//! patterns as a JSON *string* under `strudel-settingsuserPatterns`. Other
//! clients can send `{"userPatterns": {...}}` with a plain object. Only the
//! exact field names in [`SyncConfig::SNAPSHOT_FIELDS`] are recognized.
//!
//! ```text
//! {
//!   "userPatterns": {
//!     "<id>": { "code": "<pattern source>", ...ignored },
//!     ...
//!   }
//! }
//! ```

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// One pattern's source code as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub code: String,
}

impl PatternEntry {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Every pattern submitted in one sync call, keyed by raw identifier.
///
/// Identifiers are validated by the engine, not here, so a snapshot can hold
/// names that will be rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, PatternEntry>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a pattern.
    pub fn insert(&mut self, id: impl Into<String>, code: impl Into<String>) {
        self.entries.insert(id.into(), PatternEntry::new(code));
    }

    /// Builder-style [`Snapshot::insert`].
    pub fn with(mut self, id: impl Into<String>, code: impl Into<String>) -> Self {
        self.insert(id, code);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PatternEntry> {
        self.entries.get(id)
    }

    /// Entries in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatternEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Extract a snapshot from a sync payload.
    ///
    /// Returns `Ok(None)` when the payload carries no snapshot at all, and
    /// [`SyncError::MalformedSnapshot`] when the field is there but unusable.
    pub fn from_payload(payload: &Value) -> Result<Option<Self>> {
        let Some(object) = payload.as_object() else {
            return Ok(None);
        };

        let Some((field, raw)) = SyncConfig::SNAPSHOT_FIELDS
            .iter()
            .find_map(|field| object.get(*field).map(|value| (*field, value)))
        else {
            return Ok(None);
        };

        let patterns = match raw {
            Value::Null => return Ok(None),
            Value::String(encoded) => serde_json::from_str::<Value>(encoded)?,
            other => other.clone(),
        };

        if !patterns.is_object() {
            return Err(SyncError::MalformedSnapshot {
                message: format!("`{}` must be an object of patterns", field),
            });
        }

        let entries: BTreeMap<String, PatternEntry> = serde_json::from_value(patterns)?;
        Ok(Some(Self { entries }))
    }

    /// Encode as a payload that [`Snapshot::from_payload`] accepts.
    pub fn to_payload(&self) -> Value {
        let mut payload = serde_json::Map::new();
        payload.insert(
            SyncConfig::SNAPSHOT_FIELDS[0].to_string(),
            json!(self.entries),
        );
        Value::Object(payload)
    }
}

impl<K, V> FromIterator<(K, V)> for Snapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (id, code) in iter {
            snapshot.insert(id, code);
        }
        snapshot
    }
}
