//! Filesystem helpers for the live pointer
//!
//! - `symlink_dir`: creates a directory symlink on Unix and Windows
//! - `atomic_rename`: replaces a path in one step (Windows requires explicit delete)
//! - `replace_symlink`: points a link at a new target without a window where it is missing

use std::io;
use std::path::{Path, PathBuf};

/// Create a symbolic link at `link` pointing to the directory `target`.
pub fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_dir(target, link)
    }
}

/// Cross-platform rename that replaces the destination.
///
/// On Unix, `fs::rename` atomically replaces the target if it exists.
/// On Windows, `fs::rename` fails if the target exists, so the target is
/// removed first and the replacement is no longer atomic there.
pub fn atomic_rename(src: &Path, dst: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        if std::fs::symlink_metadata(dst).is_ok() {
            std::fs::remove_dir(dst).or_else(|_| std::fs::remove_file(dst))?;
        }
    }
    std::fs::rename(src, dst)
}

/// Point `link` at `target` by creating a uniquely named sibling link and
/// renaming it over `link`.
///
/// Readers resolving `link` concurrently see either the previous target or
/// the new one. If the rename fails the temporary link is removed.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use wallmount::fs_utils::replace_symlink;
///
/// replace_symlink(Path::new("/srv/wall/inbox/v2"), Path::new("/srv/wall/static/sketch"))?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn replace_symlink(target: &Path, link: &Path) -> io::Result<()> {
    let tmp = temp_link_path(link);
    symlink_dir(target, &tmp)?;
    if let Err(e) = atomic_rename(&tmp, link) {
        let _ = remove_link(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Remove a symlink (not the directory it points to).
pub fn remove_link(link: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        std::fs::remove_dir(link).or_else(|_| std::fs::remove_file(link))
    }
    #[cfg(not(windows))]
    {
        std::fs::remove_file(link)
    }
}

/// Prefix shared by all temporary pointer links
pub const TEMP_LINK_PREFIX: &str = ".";
/// Suffix shared by all temporary pointer links
pub const TEMP_LINK_SUFFIX: &str = ".tmp";

/// `<dir>/.<name>.<uuid>.tmp`
fn temp_link_path(link: &Path) -> PathBuf {
    let name = link
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "link".to_string());
    let tmp_name = format!(
        "{}{}.{}{}",
        TEMP_LINK_PREFIX,
        name,
        uuid::Uuid::new_v4().simple(),
        TEMP_LINK_SUFFIX
    );
    link.with_file_name(tmp_name)
}

/// Whether a file name looks like a leftover temporary link
pub fn is_temp_link_name(name: &str) -> bool {
    name.starts_with(TEMP_LINK_PREFIX) && name.ends_with(TEMP_LINK_SUFFIX)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_replace_symlink_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::create_dir(&b).unwrap();
        let link = dir.path().join("live");

        replace_symlink(&a, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), a);

        replace_symlink(&b, &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), b);

        // No temp links left behind
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_temp_link_name(&e.file_name().to_string_lossy()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_remove_link_keeps_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("index.html"), "hi").unwrap();
        let link = dir.path().join("live");
        symlink_dir(&target, &link).unwrap();

        remove_link(&link).unwrap();
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(target.join("index.html").exists());
    }

    #[test]
    fn test_temp_link_names() {
        assert!(is_temp_link_name(".sketch.0123abcd.tmp"));
        assert!(!is_temp_link_name("sketch"));
        assert!(!is_temp_link_name(".sketch"));
    }
}
