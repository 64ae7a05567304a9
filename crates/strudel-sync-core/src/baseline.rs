//! Baseline cache: the last content known to be durable, per pattern.
//!
//! Each identifier owns a slot guarded by its own async mutex. An empty slot
//! means "never resolved"; a resolved slot holds a [`Baseline`]. Holding the
//! slot lock for the whole resolve-compare-write sequence serializes work on
//! one identifier while leaving other identifiers free.
//!
//! Slots are never evicted; the set of patterns a single user keeps is small.

use crate::identifier::PatternId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Resolved baseline for one pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// No record existed (or it could not be read) when first resolved.
    Absent,
    /// Content last read from or written to storage.
    Present(String),
}

impl Baseline {
    /// Whether writing `content` would be a no-op.
    ///
    /// `Absent` never matches, not even the empty string.
    pub fn matches(&self, content: &str) -> bool {
        matches!(self, Baseline::Present(current) if current == content)
    }
}

/// A locked slot. `None` until the baseline has been resolved.
pub(crate) type SlotGuard = OwnedMutexGuard<Option<Baseline>>;

type Slot = Arc<AsyncMutex<Option<Baseline>>>;

/// Process-wide map of pattern identifier to baseline.
#[derive(Debug, Default)]
pub struct BaselineCache {
    slots: Mutex<HashMap<PatternId, Slot>>,
}

impl BaselineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the slot for `id`, creating an unresolved one on first sight.
    ///
    /// The map lock is released before waiting on the slot.
    pub(crate) async fn lock(&self, id: &PatternId) -> SlotGuard {
        let slot = {
            let mut slots = self.slots.lock().expect("baseline map lock poisoned");
            slots.entry(id.clone()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Resolved baseline for `id`, or `None` if it was never resolved.
    ///
    /// Waits for any in-flight sync of the same identifier to finish.
    pub async fn get(&self, id: &str) -> Option<Baseline> {
        let slot = {
            let slots = self.slots.lock().expect("baseline map lock poisoned");
            slots.get(id).cloned()
        }?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Number of identifiers that have a slot.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("baseline map lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(raw: &str) -> PatternId {
        PatternId::parse(raw).unwrap()
    }

    #[test]
    fn test_absent_never_matches() {
        assert!(!Baseline::Absent.matches(""));
        assert!(Baseline::Present(String::new()).matches(""));
        assert!(!Baseline::Present("a".into()).matches("b"));
    }

    #[tokio::test]
    async fn test_new_slot_is_unresolved() {
        let cache = BaselineCache::new();
        assert!(cache.is_empty());

        let guard = cache.lock(&id("a")).await;
        assert!(guard.is_none());
        drop(guard);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("never-seen").await, None);
    }

    #[tokio::test]
    async fn test_resolved_value_persists() {
        let cache = BaselineCache::new();
        *cache.lock(&id("a")).await = Some(Baseline::Absent);
        assert_eq!(cache.get("a").await, Some(Baseline::Absent));

        *cache.lock(&id("a")).await = Some(Baseline::Present("x".into()));
        assert_eq!(cache.get("a").await, Some(Baseline::Present("x".into())));
    }

    #[tokio::test]
    async fn test_slots_are_independent() {
        let cache = BaselineCache::new();
        let _held = cache.lock(&id("a")).await;

        let other = tokio::time::timeout(Duration::from_secs(1), cache.lock(&id("b"))).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), cache.lock(&id("a"))).await;
        assert!(same.is_err());
    }
}
