//! Single-slot push reservation
//!
//! `PublishLock` is plain state with no synchronization of its own. It is
//! owned by `PushController`, which guards it (together with every store
//! mutation) behind one mutex. There is exactly one slot for the whole
//! server because it serves a single content stream.

use std::time::{Duration, Instant};

use crate::error::{Result, WallmountError};
use crate::version_id::VersionId;

/// An outstanding push reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub id: VersionId,
    /// When the slot was first reserved (idempotent re-reserves keep it)
    pub reserved_at: Instant,
}

impl Reservation {
    pub fn age(&self) -> Duration {
        self.reserved_at.elapsed()
    }
}

/// Push slot holding the id of the in-flight push, if any
#[derive(Debug, Default)]
pub struct PublishLock {
    slot: Option<Reservation>,
}

impl PublishLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for `id`.
    ///
    /// Succeeds idempotently when `id` already holds the slot; fails with
    /// `Conflict` when another id does.
    pub fn reserve(&mut self, id: &VersionId) -> Result<()> {
        match &self.slot {
            Some(held) if &held.id == id => Ok(()),
            Some(held) => Err(WallmountError::Conflict {
                requested: id.to_string(),
                reserved: Some(held.id.to_string()),
            }),
            None => {
                self.slot = Some(Reservation {
                    id: id.clone(),
                    reserved_at: Instant::now(),
                });
                Ok(())
            }
        }
    }

    /// Clear the slot unconditionally, returning what was held.
    pub fn release(&mut self) -> Option<Reservation> {
        self.slot.take()
    }

    pub fn current(&self) -> Option<&Reservation> {
        self.slot.as_ref()
    }

    pub fn current_id(&self) -> Option<&VersionId> {
        self.slot.as_ref().map(|r| &r.id)
    }

    /// Whether the slot is held by exactly `id`
    pub fn is_held_by(&self, id: &VersionId) -> bool {
        self.current_id() == Some(id)
    }

    /// Whether the current reservation is older than `timeout`
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.slot.as_ref().is_some_and(|r| r.age() >= timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> VersionId {
        VersionId::parse(raw).unwrap()
    }

    #[test]
    fn test_reserve_and_release() {
        let mut lock = PublishLock::new();
        assert!(lock.current().is_none());

        lock.reserve(&id("v1")).unwrap();
        assert!(lock.is_held_by(&id("v1")));

        let released = lock.release().unwrap();
        assert_eq!(released.id, id("v1"));
        assert!(lock.current().is_none());
        assert!(lock.release().is_none());
    }

    #[test]
    fn test_reserve_is_idempotent_for_same_id() {
        let mut lock = PublishLock::new();
        lock.reserve(&id("v1")).unwrap();
        let first = lock.current().unwrap().reserved_at;

        lock.reserve(&id("v1")).unwrap();
        assert_eq!(lock.current().unwrap().reserved_at, first);
    }

    #[test]
    fn test_reserve_conflicts_for_other_id() {
        let mut lock = PublishLock::new();
        lock.reserve(&id("v1")).unwrap();

        let err = lock.reserve(&id("v2")).unwrap_err();
        match err {
            WallmountError::Conflict {
                requested,
                reserved,
            } => {
                assert_eq!(requested, "v2");
                assert_eq!(reserved.as_deref(), Some("v1"));
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert!(lock.is_held_by(&id("v1")));
    }

    #[test]
    fn test_expiry() {
        let mut lock = PublishLock::new();
        assert!(!lock.is_expired(Duration::ZERO));

        lock.reserve(&id("v1")).unwrap();
        assert!(lock.is_expired(Duration::ZERO));
        assert!(!lock.is_expired(Duration::from_secs(3600)));
    }
}
