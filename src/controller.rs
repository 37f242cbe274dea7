//! Push protocol state machine
//!
//! ```text
//!            START(id)                 FINISH(id)
//!   Idle ─────────────────► Reserved(id) ─────────► register → switch → sweep → release ─► Idle
//!    ▲                          │  │
//!    │        OVERRIDE          │  │ START(id) again: ok (idempotent)
//!    └──────────────────────────┘  │ START(other) / FINISH(other): Conflict
//!                                  │ FINISH(id) without staged content: NotFound, stays Reserved
//! ```
//!
//! # Locking
//!
//! All push commands run under one `parking_lot::Mutex` that owns the
//! `PublishLock`. Every store mutation (switch, sweep) happens while that
//! mutex is held, so the FINISH sequence is atomic with respect to other
//! push commands. Read paths (`live`, `staged`) go straight to the
//! `VersionStore` and never take the mutex.
//!
//! Across processes, the controller holds the store's owner lock for its
//! whole lifetime, so an offline sweep refuses to run against a live server.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;

use crate::error::{Result, WallmountError};
use crate::lock::PublishLock;
use crate::store::{StoreLock, VersionStore};
use crate::sweeper::{RetentionSweeper, SweepReport};
use crate::version_id::VersionId;

/// A parsed push command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushCommand {
    Start(VersionId),
    Finish(VersionId),
    Override,
}

impl PushCommand {
    /// Parse the `command` / `push_id` query pair of a push request.
    ///
    /// The id is validated here, before anything touches the filesystem.
    pub fn parse(command: &str, push_id: Option<&str>) -> Result<Self> {
        let require_id = || -> Result<VersionId> {
            let raw = push_id.ok_or_else(|| {
                WallmountError::invalid_identifier("", format!("{} requires push_id", command))
            })?;
            VersionId::parse(raw)
        };

        match command {
            "START" => Ok(Self::Start(require_id()?)),
            "FINISH" => Ok(Self::Finish(require_id()?)),
            "OVERRIDE" | "RESET" => Ok(Self::Override),
            other => Err(WallmountError::InvalidCommand {
                command: other.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "START",
            Self::Finish(_) => "FINISH",
            Self::Override => "OVERRIDE",
        }
    }
}

/// Observable state of the push slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "push_id", rename_all = "snake_case")]
pub enum PushState {
    Idle,
    Reserved(VersionId),
}

impl fmt::Display for PushState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Reserved(id) => write!(f, "reserved({})", id),
        }
    }
}

/// Result of a successful FINISH
#[derive(Debug, Clone, Serialize)]
pub struct FinishReport {
    /// Version now live
    pub live: VersionId,
    /// Version that was live before the switch
    pub previous: Option<VersionId>,
    pub sweep: Option<SweepReport>,
    /// Set when the sweep itself could not run
    pub sweep_error: Option<String>,
}

/// Result of executing a push command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushOutcome {
    Start { push_id: VersionId },
    Finish(FinishReport),
    Override { released: Option<VersionId> },
}

/// Owner of the push slot and the only writer of the live pointer
#[derive(Debug)]
pub struct PushController {
    store: VersionStore,
    sweeper: RetentionSweeper,
    lock: Mutex<PublishLock>,
    reservation_timeout: Option<Duration>,
    _owner: StoreLock,
}

impl PushController {
    /// Create a controller in the `Idle` state.
    ///
    /// Reservations never outlive the process: a push in flight when the
    /// server stopped is simply abandoned.
    ///
    /// Fails with `StoreBusy` if another controller or an offline sweep owns
    /// the store.
    pub fn new(store: VersionStore) -> Result<Self> {
        let owner = store.try_lock_owner()?;
        Ok(Self {
            store,
            sweeper: RetentionSweeper::new(),
            lock: Mutex::new(PublishLock::new()),
            reservation_timeout: None,
            _owner: owner,
        })
    }

    /// Automatically release reservations older than `timeout`
    pub fn with_reservation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reservation_timeout = timeout;
        self
    }

    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    pub fn reservation_timeout(&self) -> Option<Duration> {
        self.reservation_timeout
    }

    // ========================================================================
    // Push commands (serialized)
    // ========================================================================

    /// Dispatch a parsed command
    pub fn execute(&self, command: PushCommand) -> Result<PushOutcome> {
        match command {
            PushCommand::Start(id) => {
                self.start(&id)?;
                Ok(PushOutcome::Start { push_id: id })
            }
            PushCommand::Finish(id) => self.finish(&id).map(PushOutcome::Finish),
            PushCommand::Override => Ok(PushOutcome::Override {
                released: self.override_lock(),
            }),
        }
    }

    /// START: reserve the push slot for `id`
    pub fn start(&self, id: &VersionId) -> Result<()> {
        let mut lock = self.acquire();
        match lock.reserve(id) {
            Ok(()) => {
                tracing::info!(op = "push.start", push_id = %id, "Push slot reserved");
                Ok(())
            }
            Err(e) => {
                tracing::info!(op = "push.start_conflict", push_id = %id, error = %e, "Push start rejected");
                Err(e)
            }
        }
    }

    /// FINISH: make `id` live, sweep superseded versions, release the slot.
    ///
    /// The slot is only released once the switch has happened. A missing
    /// staging directory or a failed switch leaves `id` reserved so the push
    /// can be retried or overridden.
    pub fn finish(&self, id: &VersionId) -> Result<FinishReport> {
        let mut lock = self.acquire();

        if !lock.is_held_by(id) {
            let err = WallmountError::Conflict {
                requested: id.to_string(),
                reserved: lock.current_id().map(|held| held.to_string()),
            };
            tracing::info!(op = "push.finish_conflict", push_id = %id, error = %err, "Push finish rejected");
            return Err(err);
        }

        if let Err(e) = self.store.register_staged(id) {
            tracing::warn!(op = "push.finish_not_staged", push_id = %id, error = %e, "Finish without staged content");
            return Err(e);
        }

        let previous = self.store.live().unwrap_or_else(|e| {
            tracing::warn!(op = "push.previous_unreadable", error = %e, "Previous live version unreadable");
            None
        });

        self.store.switch_live(id)?;
        tracing::info!(
            op = "push.switch",
            push_id = %id,
            previous = previous.as_ref().map(|p| p.as_str()).unwrap_or("<none>"),
            "Live version switched"
        );

        let (sweep, sweep_error) = match self.sweeper.sweep(&self.store) {
            Ok(report) => (Some(report), None),
            Err(e) => {
                tracing::warn!(op = "push.sweep_failed", push_id = %id, error = %e, "Retention sweep failed after switch");
                (None, Some(e.to_string()))
            }
        };

        lock.release();
        tracing::info!(op = "push.finish", push_id = %id, "Push finished, slot released");

        Ok(FinishReport {
            live: id.clone(),
            previous,
            sweep,
            sweep_error,
        })
    }

    /// OVERRIDE: force-release the slot regardless of state.
    ///
    /// Returns the id that held the slot, if any.
    pub fn override_lock(&self) -> Option<VersionId> {
        let released = self.lock.lock().release().map(|r| r.id);
        match &released {
            Some(id) => tracing::error!(op = "push.override", push_id = %id, "Push slot forcibly released"),
            None => tracing::error!(op = "push.override", "Override issued with no push reserved"),
        }
        released
    }

    /// Release the reservation if it is older than the configured timeout.
    ///
    /// Returns the id that was released.
    pub fn expire_stale_reservation(&self) -> Option<VersionId> {
        let mut lock = self.lock.lock();
        self.expire_locked(&mut lock)
    }

    /// Run the retention sweep under the push mutex
    pub fn sweep(&self) -> Result<SweepReport> {
        let _lock = self.lock.lock();
        self.sweeper.sweep(&self.store)
    }

    // ========================================================================
    // Read paths
    // ========================================================================

    /// Current state of the push slot (waits for an in-flight command)
    pub fn state(&self) -> PushState {
        Self::state_of(&self.lock.lock())
    }

    /// Current state of the push slot, or `None` while a push command holds
    /// the mutex. Never blocks.
    pub fn try_state(&self) -> Option<PushState> {
        self.lock.try_lock().map(|lock| Self::state_of(&lock))
    }

    /// The live version, read from durable state without touching the slot
    pub fn live(&self) -> Result<Option<VersionId>> {
        self.store.live()
    }

    /// All staged versions, without touching the slot
    pub fn staged(&self) -> Result<BTreeSet<VersionId>> {
        self.store.list_staged()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn acquire(&self) -> MutexGuard<'_, PublishLock> {
        let mut lock = self.lock.lock();
        self.expire_locked(&mut lock);
        lock
    }

    fn expire_locked(&self, lock: &mut PublishLock) -> Option<VersionId> {
        let timeout = self.reservation_timeout?;
        if !lock.is_expired(timeout) {
            return None;
        }
        let released = lock.release().map(|r| r.id);
        if let Some(id) = &released {
            tracing::warn!(
                op = "push.timeout",
                push_id = %id,
                timeout_secs = timeout.as_secs(),
                "Push reservation timed out, slot released"
            );
        }
        released
    }

    fn state_of(lock: &PublishLock) -> PushState {
        match lock.current_id() {
            Some(id) => PushState::Reserved(id.clone()),
            None => PushState::Idle,
        }
    }
}
