//! Print the live version and the staged versions
//!
//! With `--verbose`, the effective configuration follows as TOML.

use crate::config::WallmountConfig;
use crate::error::Result;
use crate::store::VersionStore;

pub fn run_status(config: &WallmountConfig, show_config: bool) -> Result<String> {
    let store = VersionStore::open(&config.storage.root_dir)?;
    let live = store.live()?;
    let staged = store.list_staged()?;

    let mut out = format!("root: {}\n", store.root().display());
    match &live {
        Some(id) => out.push_str(&format!("live: {}\n", id)),
        None => out.push_str("live: <none>\n"),
    }
    out.push_str(&format!("staged: {}\n", staged.len()));
    for id in &staged {
        let marker = if live.as_ref() == Some(id) { " (live)" } else { "" };
        out.push_str(&format!("  - {}{}\n", id, marker));
    }
    if show_config {
        out.push_str("\n# effective configuration\n");
        out.push_str(&config.to_toml()?);
    }
    Ok(out)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::version_id::VersionId;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_status_marks_live() {
        let dir = TempDir::new().unwrap();
        let mut config = WallmountConfig::default();
        config.storage.root_dir = dir.path().to_path_buf();

        let store = VersionStore::open(dir.path()).unwrap();
        for raw in ["a", "b"] {
            fs::create_dir_all(store.inbox_dir().join(raw)).unwrap();
        }
        store.switch_live(&VersionId::parse("b").unwrap()).unwrap();

        let out = run_status(&config, false).unwrap();
        assert!(out.contains("live: b\n"));
        assert!(out.contains("staged: 2\n"));
        assert!(out.contains("  - a\n"));
        assert!(out.contains("  - b (live)\n"));
    }

    #[test]
    fn test_status_verbose_prints_config() {
        let dir = TempDir::new().unwrap();
        let mut config = WallmountConfig::default();
        config.storage.root_dir = dir.path().to_path_buf();
        config.display.title = "lobby wall".to_string();

        let out = run_status(&config, true).unwrap();
        assert!(out.contains("# effective configuration\n"));
        assert!(out.contains("[display]"));
        assert!(out.contains("title = \"lobby wall\""));
        assert!(!run_status(&config, false).unwrap().contains("[display]"));
    }
}
