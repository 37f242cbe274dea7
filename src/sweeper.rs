//! Retention sweep: reclaim staged versions superseded by the live one

use serde::Serialize;

use crate::error::{Result, WallmountError};
use crate::store::VersionStore;
use crate::version_id::VersionId;

/// Outcome of one sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Live version the sweep retained
    pub live: Option<VersionId>,
    pub deleted: Vec<VersionId>,
    /// Versions that could not be deleted, with the reason
    pub failed: Vec<(VersionId, String)>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deletes every staged version except the live one
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionSweeper;

impl RetentionSweeper {
    pub fn new() -> Self {
        Self
    }

    /// Sweep `store`.
    ///
    /// Fails only when the live version or the staged listing cannot be read,
    /// in which case nothing is deleted. Individual deletion failures are
    /// collected in the report and do not stop the sweep. With no live
    /// version nothing is superseded and nothing is deleted.
    pub fn sweep(&self, store: &VersionStore) -> Result<SweepReport> {
        let Some(live) = store.live()? else {
            tracing::debug!(op = "sweep.skip", "No live version, nothing to sweep");
            return Ok(SweepReport::default());
        };

        let mut report = SweepReport {
            live: Some(live.clone()),
            ..SweepReport::default()
        };

        for id in store.list_staged()? {
            if id == live {
                continue;
            }
            match store.delete_staged(&id) {
                Ok(()) => {
                    tracing::debug!(op = "sweep.delete", push_id = %id, "Deleted superseded version");
                    report.deleted.push(id);
                }
                // Another sweeper got there first
                Err(WallmountError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::warn!(op = "sweep.delete_failed", push_id = %id, error = %e, "Failed to delete superseded version");
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        tracing::info!(
            op = "sweep.done",
            live = %live,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Retention sweep finished"
        );
        Ok(report)
    }
}
