//! wallmount: versioned sketch publishing for wall-mounted displays
//!
//! Display clients poll a server for the id of the live sketch and reload
//! when it changes. Publishers push a new version in two phases:
//!
//! 1. `START(id)` reserves the single push slot
//! 2. the publisher copies content into `inbox/<id>/`
//! 3. `FINISH(id)` atomically re-points the live pointer at `inbox/<id>`,
//!    sweeps superseded versions and releases the slot
//!
//! A partially uploaded version is never served, the live version is never
//! deleted, and at most one push is in flight at a time. `OVERRIDE` releases a
//! stuck slot.
//!
//! # Example
//!
//! ```no_run
//! use wallmount::{PushController, VersionId, VersionStore};
//!
//! let store = VersionStore::open("/srv/wallmount")?;
//! let controller = PushController::new(store)?;
//!
//! let id = VersionId::parse("2024-06-01.1")?;
//! controller.start(&id)?;
//! // ... transfer files into /srv/wallmount/inbox/2024-06-01.1 ...
//! controller.finish(&id)?;
//! assert_eq!(controller.live()?, Some(id));
//! # Ok::<(), wallmount::WallmountError>(())
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod fs_utils;
pub mod http;
pub mod lock;
pub mod page;
pub mod store;
pub mod sweeper;
pub mod version_id;
pub mod watchdog;

// Re-export commonly used types
pub use cli::{Cli, Commands, ServeArgs};
pub use config::WallmountConfig;
pub use controller::{FinishReport, PushCommand, PushController, PushOutcome, PushState};
pub use error::{Result, WallmountError};
pub use lock::{PublishLock, Reservation};
pub use store::{StoreLock, VersionStore};
pub use sweeper::{RetentionSweeper, SweepReport};
pub use version_id::VersionId;
pub use watchdog::{ReservationWatchdog, WatchdogConfig, WatchdogHandle};
