//! Offline retention sweep
//!
//! A running server owns the store and sweeps on its own after every push, so
//! this command takes the store's owner lock first and refuses with
//! `StoreBusy` while a server holds it.

use crate::config::WallmountConfig;
use crate::error::Result;
use crate::store::VersionStore;
use crate::sweeper::RetentionSweeper;

pub fn run_sweep(config: &WallmountConfig) -> Result<String> {
    let store = VersionStore::open(&config.storage.root_dir)?;
    let _owner = store.try_lock_owner()?;
    let report = RetentionSweeper::new().sweep(&store)?;

    let mut out = String::new();
    match &report.live {
        Some(live) => out.push_str(&format!("live: {}\n", live)),
        None => out.push_str("live: <none>\n"),
    }
    out.push_str(&format!("deleted: {}\n", report.deleted.len()));
    for id in &report.deleted {
        out.push_str(&format!("  - {}\n", id));
    }
    if !report.failed.is_empty() {
        out.push_str(&format!("failed: {}\n", report.failed.len()));
        for (id, reason) in &report.failed {
            out.push_str(&format!("  - {}: {}\n", id, reason));
        }
    }
    Ok(out)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::controller::{PushController, PushState};
    use crate::error::WallmountError;
    use crate::version_id::VersionId;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_sweep_output() {
        let dir = TempDir::new().unwrap();
        let mut config = WallmountConfig::default();
        config.storage.root_dir = dir.path().to_path_buf();

        let store = VersionStore::open(dir.path()).unwrap();
        for raw in ["old", "new"] {
            fs::create_dir_all(store.inbox_dir().join(raw)).unwrap();
        }
        store.switch_live(&VersionId::parse("new").unwrap()).unwrap();

        let out = run_sweep(&config).unwrap();
        assert_eq!(out, "live: new\ndeleted: 1\n  - old\n");
    }

    #[test]
    fn test_sweep_refuses_while_server_owns_store() {
        let dir = TempDir::new().unwrap();
        let mut config = WallmountConfig::default();
        config.storage.root_dir = dir.path().to_path_buf();

        let controller = PushController::new(VersionStore::open(dir.path()).unwrap()).unwrap();
        let stage = |raw: &str| {
            fs::create_dir_all(controller.store().inbox_dir().join(raw)).unwrap();
        };
        let v1 = VersionId::parse("v1").unwrap();
        let v2 = VersionId::parse("v2").unwrap();

        controller.start(&v1).unwrap();
        stage("v1");
        controller.finish(&v1).unwrap();
        controller.start(&v2).unwrap();
        stage("v2");

        let err = run_sweep(&config).unwrap_err();
        assert!(matches!(err, WallmountError::StoreBusy { .. }));
        assert!(controller.store().staged_path(&v2).is_dir());
        assert_eq!(controller.state(), PushState::Reserved(v2.clone()));

        controller.finish(&v2).unwrap();
        assert_eq!(controller.live().unwrap(), Some(v2));

        drop(controller);
        assert_eq!(run_sweep(&config).unwrap(), "live: v2\ndeleted: 0\n");
    }
}
