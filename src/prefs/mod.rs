//! Key-scoped preference blobs stored as JSON files under
//! `.memoweave/prefs/`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{MemoWeaveError, Result};

const PREFS_DIR: &str = "prefs";
const MAX_KEY_LENGTH: usize = 64;

/// Sidebar layout state persisted under the `sidebar` key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SidebarPrefs {
    #[serde(default)]
    pub collapsed: bool,
}

/// One JSON file per key, round-tripped through serde.
#[derive(Debug)]
pub struct PrefsStore {
    root: PathBuf,
}

impl PrefsStore {
    /// `data_dir` is the `.memoweave` directory itself.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let root = data_dir.join(PREFS_DIR);
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.key_path(key)?;
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(&path, raw)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        Ok(true)
    }

    /// Every key with a stored value, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn sidebar(&self) -> Result<SidebarPrefs> {
        Ok(self.get("sidebar")?.unwrap_or_default())
    }

    pub fn set_sidebar(&self, prefs: &SidebarPrefs) -> Result<()> {
        self.set("sidebar", prefs)
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.json", key)))
    }
}

/// Keys are lowercase alphanumerics and hyphens, at most 64 chars. The
/// key doubles as a file name, so nothing path-like gets through.
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(MemoWeaveError::invalid("pref key", key));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(MemoWeaveError::invalid("pref key", key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();

        prefs
            .set("sidebar", &SidebarPrefs { collapsed: true })
            .unwrap();
        let loaded: SidebarPrefs = prefs.get("sidebar").unwrap().unwrap();
        assert!(loaded.collapsed);
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();
        let loaded: Option<SidebarPrefs> = prefs.get("sidebar").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_remove_and_keys() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();

        prefs.set("sidebar", &SidebarPrefs::default()).unwrap();
        prefs.set("gamification", &serde_json::json!({"x": 1})).unwrap();
        assert_eq!(prefs.keys().unwrap(), vec!["gamification", "sidebar"]);

        assert!(prefs.remove("sidebar").unwrap());
        assert!(!prefs.remove("sidebar").unwrap());
        assert_eq!(prefs.keys().unwrap(), vec!["gamification"]);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();

        for bad in ["", "Has Spaces", "UPPER", "../escape", &"x".repeat(65)] {
            let result = prefs.set(bad, &serde_json::json!(1));
            assert!(
                matches!(result, Err(MemoWeaveError::InvalidField { .. })),
                "key {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_sidebar_accessor_defaults() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();
        assert!(!prefs.sidebar().unwrap().collapsed);

        prefs.set_sidebar(&SidebarPrefs { collapsed: true }).unwrap();
        assert!(prefs.sidebar().unwrap().collapsed);
    }
}
