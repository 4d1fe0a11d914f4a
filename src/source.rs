use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cache::SnapshotStore;
use crate::snapshot::{read_raw_snapshot, AccountSnapshot};

/// Supplies account snapshots by username.
pub trait SnapshotSource {
    fn fetch(&self, username: &str) -> Result<Option<AccountSnapshot>>;
}

/// Reads `<dir>/<username>.json` snapshot files.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectorySource { dir: dir.into() }
    }

    /// Path of the user's snapshot file. Names that could escape the data
    /// directory are rejected.
    pub fn path_for(&self, username: &str) -> Result<PathBuf> {
        if username.is_empty()
            || username.starts_with('.')
            || username.contains(['/', '\\'])
            || username.contains("..")
        {
            anyhow::bail!("Invalid username '{}'", username);
        }
        Ok(self.dir.join(format!("{}.json", username)))
    }

    /// Usernames of every snapshot file in the directory, sorted.
    pub fn usernames(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list snapshot directory {:?}", self.dir))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl SnapshotSource for DirectorySource {
    fn fetch(&self, username: &str) -> Result<Option<AccountSnapshot>> {
        let path = self.path_for(username)?;
        if !path.exists() {
            info!(action = "miss", component = "snapshot_directory", path = ?path, "No snapshot file for user");
            return Ok(None);
        }
        load_snapshot_file(&path).map(Some)
    }
}

pub fn load_snapshot_file(path: &Path) -> Result<AccountSnapshot> {
    let raw = read_raw_snapshot(path)?;
    AccountSnapshot::try_from(raw).with_context(|| format!("Malformed snapshot in {:?}", path))
}

/// Consults the cache before the inner source and caches whatever the inner
/// source returns.
pub struct CachedSource<S, C> {
    inner: S,
    cache: C,
}

impl<S: SnapshotSource, C: SnapshotStore> CachedSource<S, C> {
    pub fn new(inner: S, cache: C) -> Self {
        CachedSource { inner, cache }
    }
}

impl<S: SnapshotSource, C: SnapshotStore> SnapshotSource for CachedSource<S, C> {
    fn fetch(&self, username: &str) -> Result<Option<AccountSnapshot>> {
        match self.cache.get(username) {
            Ok(Some(snapshot)) => return Ok(Some(snapshot)),
            Ok(None) => {}
            Err(e) => {
                warn!(action = "lookup", component = "snapshot_cache", username, error = %e, "Cache lookup failed, treating as miss");
            }
        }

        info!(action = "collect", component = "snapshot_source", username, "Collecting fresh snapshot");
        let fetched = self.inner.fetch(username)?;
        if let Some(snapshot) = &fetched {
            if let Err(e) = self.cache.put(username, snapshot) {
                warn!(action = "store", component = "snapshot_cache", username, error = %e, "Failed to cache snapshot");
            }
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{SqliteSnapshotStore, DEFAULT_TTL_HOURS};
    use chrono::Duration;
    use std::cell::Cell;
    use tempfile::TempDir;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl SnapshotSource for CountingSource {
        fn fetch(&self, username: &str) -> Result<Option<AccountSnapshot>> {
            self.calls.set(self.calls.get() + 1);
            if username == "missing" {
                return Ok(None);
            }
            let mut snapshot = AccountSnapshot::default();
            snapshot.profile.username = username.to_string();
            Ok(Some(snapshot))
        }
    }

    #[test]
    fn directory_source_reads_and_lists_snapshots() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("alice.json"), r#"{"profile": {"username": "alice"}}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.usernames().unwrap(), vec!["alice".to_string()]);
        assert_eq!(source.fetch("alice").unwrap().unwrap().username(), "alice");
        assert!(source.fetch("bob").unwrap().is_none());
    }

    #[test]
    fn directory_source_rejects_profile_less_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ghost.json"), r#"{"followers": []}"#).unwrap();

        let err = DirectorySource::new(dir.path()).fetch("ghost").unwrap_err();
        assert!(format!("{:#}", err).contains("profile"));
    }

    #[test]
    fn directory_source_rejects_path_like_usernames() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(dir.path().join("outside.json"), r#"{"profile": {}}"#).unwrap();

        let source = DirectorySource::new(&data);
        for name in ["../outside", "a/b", "a\\b", ".hidden", ""] {
            assert!(source.fetch(name).is_err(), "{name:?} was accepted");
        }
        assert!(source.path_for("test_user.1").is_ok());
    }

    struct BrokenStore;

    impl SnapshotStore for BrokenStore {
        fn get(&self, _username: &str) -> Result<Option<AccountSnapshot>> {
            anyhow::bail!("database is locked")
        }

        fn put(&self, _username: &str, _snapshot: &AccountSnapshot) -> Result<()> {
            anyhow::bail!("attempt to write a readonly database")
        }

        fn clear(&self) -> Result<usize> {
            anyhow::bail!("attempt to write a readonly database")
        }
    }

    #[test]
    fn cache_failures_do_not_fail_the_fetch() {
        let source = CachedSource::new(CountingSource { calls: Cell::new(0) }, BrokenStore);

        let snapshot = source.fetch("alice").unwrap().unwrap();
        assert_eq!(snapshot.username(), "alice");
        assert!(source.fetch("missing").unwrap().is_none());
        assert_eq!(source.inner.calls.get(), 2);
    }

    #[test]
    fn cached_source_fetches_once() {
        let cache = SqliteSnapshotStore::in_memory(Duration::hours(DEFAULT_TTL_HOURS)).unwrap();
        let source = CachedSource::new(CountingSource { calls: Cell::new(0) }, cache);

        assert!(source.fetch("alice").unwrap().is_some());
        assert!(source.fetch("alice").unwrap().is_some());
        assert_eq!(source.inner.calls.get(), 1);

        assert!(source.fetch("missing").unwrap().is_none());
        assert!(source.fetch("missing").unwrap().is_none());
        assert_eq!(source.inner.calls.get(), 3);
    }
}
