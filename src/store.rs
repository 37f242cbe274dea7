//! Filesystem-backed version store
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── .wallmount.lock   owner lock (held by a running server)
//! ├── inbox/
//! │   ├── v1/            staged version (populated by the publisher's transfer step)
//! │   └── v2/
//! └── static/
//!     └── sketch -> <root>/inbox/v2    live pointer
//! ```
//!
//! The live pointer is the only durable record of which version is served.
//! It is replaced with a single `rename`, so a reader resolving it always sees
//! a complete version. Nothing about the live version is cached in memory:
//! every `live()` call resolves the pointer again.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs4::FileExt;

use crate::error::{Result, WallmountError};
use crate::fs_utils;
use crate::version_id::VersionId;

/// Staging directory name under the root
pub const INBOX_DIR: &str = "inbox";
/// Directory holding the live pointer
pub const STATIC_DIR: &str = "static";
/// Name of the live pointer inside `static/`
pub const LIVE_POINTER: &str = "sketch";
/// Owner lock file under the root
pub const OWNER_LOCK: &str = ".wallmount.lock";

/// Exclusive advisory lock on a store root.
///
/// Whoever holds it may mutate the store: a running server for its whole
/// lifetime, or an offline sweep for its duration. The lock is released when
/// the value is dropped (or the process dies).
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Mapping from version id to staged content, plus the live pointer
#[derive(Debug, Clone)]
pub struct VersionStore {
    root: PathBuf,
    inbox: PathBuf,
    pointer: PathBuf,
}

impl VersionStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// Leftover temporary pointer links from an interrupted switch are removed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root.join(INBOX_DIR))?;
        fs::create_dir_all(root.join(STATIC_DIR))?;
        let root = fs::canonicalize(root)?;

        let store = Self {
            inbox: root.join(INBOX_DIR),
            pointer: root.join(STATIC_DIR).join(LIVE_POINTER),
            root,
        };
        store.remove_stale_temp_links()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn inbox_dir(&self) -> &Path {
        &self.inbox
    }

    pub fn pointer_path(&self) -> &Path {
        &self.pointer
    }

    /// Take the owner lock without waiting.
    ///
    /// Fails with `StoreBusy` while another holder has it, including another
    /// handle in this process.
    pub fn try_lock_owner(&self) -> Result<StoreLock> {
        let path = self.root.join(OWNER_LOCK);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!(lock = %path.display(), "Store owner lock taken");
                Ok(StoreLock { _file: file, path })
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                Err(WallmountError::StoreBusy { path })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Directory where the content for `id` is (or would be) staged
    pub fn staged_path(&self, id: &VersionId) -> PathBuf {
        self.inbox.join(id.as_str())
    }

    /// Confirm that content for `id` has been transferred into the inbox.
    pub fn register_staged(&self, id: &VersionId) -> Result<PathBuf> {
        let path = self.staged_path(id);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_dir() => Ok(path),
            Ok(_) => Err(WallmountError::NotFound { id: id.to_string() }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(WallmountError::NotFound { id: id.to_string() })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically re-point the live pointer at `id`.
    pub fn switch_live(&self, id: &VersionId) -> Result<()> {
        let target = self.register_staged(id)?;
        fs_utils::replace_symlink(&target, &self.pointer)?;
        tracing::debug!(push_id = %id, pointer = %self.pointer.display(), "Live pointer replaced");
        Ok(())
    }

    /// Resolve the live pointer.
    ///
    /// Returns `None` before the first successful switch. A pointer that exists
    /// but cannot be read or does not name a valid version is reported as
    /// `LivePointerUnreadable`.
    pub fn live(&self) -> Result<Option<VersionId>> {
        let target = match fs::read_link(&self.pointer) {
            Ok(target) => target,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.pointer_error(e.to_string())),
        };

        let name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| self.pointer_error(format!("target {} has no name", target.display())))?;

        VersionId::parse(name)
            .map(Some)
            .map_err(|e| self.pointer_error(e.to_string()))
    }

    /// All staged versions, live or not.
    ///
    /// Inbox entries that are not directories or whose names are not valid
    /// version ids are not part of the store and are skipped.
    pub fn list_staged(&self) -> Result<BTreeSet<VersionId>> {
        let mut ids = BTreeSet::new();
        for entry in fs::read_dir(&self.inbox)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match name.to_str().map(VersionId::parse) {
                Some(Ok(id)) => {
                    ids.insert(id);
                }
                _ => {
                    tracing::debug!(entry = ?name, "Ignoring foreign inbox entry");
                }
            }
        }
        Ok(ids)
    }

    /// Remove a staged version. The live version can never be deleted.
    pub fn delete_staged(&self, id: &VersionId) -> Result<()> {
        if self.live()?.as_ref() == Some(id) {
            return Err(WallmountError::Forbidden { id: id.to_string() });
        }

        let path = self.staged_path(id);
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(WallmountError::NotFound { id: id.to_string() }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WallmountError::NotFound { id: id.to_string() })
            }
            Err(e) => return Err(e.into()),
        }

        fs::remove_dir_all(&path)?;
        Ok(())
    }

    fn remove_stale_temp_links(&self) -> Result<()> {
        let Some(static_dir) = self.pointer.parent() else {
            return Ok(());
        };
        for entry in fs::read_dir(static_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if fs_utils::is_temp_link_name(&name.to_string_lossy()) {
                tracing::info!(link = ?name, "Removing stale temporary pointer link");
                fs_utils::remove_link(&entry.path())?;
            }
        }
        Ok(())
    }

    fn pointer_error(&self, message: String) -> WallmountError {
        WallmountError::LivePointerUnreadable {
            path: self.pointer.clone(),
            message,
        }
    }
}
