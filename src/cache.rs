//! Shared filesystem caches.
//!
//! Both caches are compute-once: the first caller does the filesystem work,
//! later callers read the memoized answer. Locks are never held across an
//! await.

use crate::utils::date::from_system_time;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

/// Output directories known to exist.
#[derive(Debug, Default)]
pub struct ExistenceCache {
    dirs: RwLock<FxHashSet<PathBuf>>,
}

impl ExistenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `dir` (and parents) unless it was seen before.
    pub async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if self.dirs.read().contains(dir) {
            return Ok(());
        }
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating output directory `{}`", dir.display()))?;
        self.dirs.write().insert(dir.to_path_buf());
        Ok(())
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.read().contains(dir)
    }

    pub fn clear(&self) {
        self.dirs.write().clear();
    }
}

/// Creation and modification times of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTimes {
    /// `None` where the filesystem does not record birth time.
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

/// Memoized input file stats.
#[derive(Debug, Default)]
pub struct StatCache {
    times: RwLock<FxHashMap<PathBuf, FileTimes>>,
}

impl StatCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn times(&self, path: &Path) -> Result<FileTimes> {
        if let Some(times) = self.times.read().get(path) {
            return Ok(*times);
        }
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("reading metadata of `{}`", path.display()))?;
        let times = FileTimes {
            created: metadata.created().ok().map(from_system_time),
            modified: metadata.modified().ok().map(from_system_time),
        };
        self.times.write().insert(path.to_path_buf(), times);
        Ok(times)
    }

    pub fn clear(&self) {
        self.times.write().clear();
    }
}
