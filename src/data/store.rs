//! Global and directory data sources.
//!
//! [`DataStore`] is the collaborator the cascade merger asks for the two
//! data layers that do not live in the template itself.
//!
//! # Filesystem layout ([`FsDataStore`])
//!
//! ```text
//! src/
//! ├── _data/
//! │   ├── site.json          → global `site`
//! │   └── nav.json           → global `nav`
//! └── posts/
//!     ├── posts.json         → directory data for everything under posts/
//!     ├── a.md
//!     └── a.data.json        → template data for a.md only
//! ```
//!
//! Directory data merges from the shallowest directory down to the template's
//! own data files, deeper files winning.

use super::merge::merge_into;
use crate::config::SiteConfig;
use crate::utils::slug::relative_to;
use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Supplies the global and directory layers of the data cascade.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Site-wide data visible to every template.
    async fn global_data(&self, input: &Path) -> Result<Value>;

    /// Data from directory and template data files applying to `input`.
    async fn directory_data(&self, input: &Path) -> Result<Value>;
}

// ============================================================================
// Filesystem store
// ============================================================================

/// Reads `*.json` data files, memoizing each result.
///
/// # Caching
///
/// Global data is loaded once; directory data once per template path.
/// Call [`FsDataStore::clear`] when data files change.
#[derive(Debug)]
pub struct FsDataStore {
    input_dir: PathBuf,
    data_dir: PathBuf,
    global: RwLock<Option<Value>>,
    directories: RwLock<FxHashMap<PathBuf, Value>>,
}

impl FsDataStore {
    pub fn new(config: &SiteConfig) -> Self {
        let input_dir = config.input_dir();
        Self {
            data_dir: input_dir.join(&config.build.data),
            input_dir,
            global: RwLock::new(None),
            directories: RwLock::new(FxHashMap::default()),
        }
    }

    /// Drop every memoized value.
    pub fn clear(&self) {
        *self.global.write() = None;
        self.directories.write().clear();
    }

    /// Data files applying to `relative`, shallowest first.
    fn candidate_files(&self, relative: &Path) -> Vec<PathBuf> {
        let parent = relative.parent().unwrap_or(Path::new(""));
        let mut dirs: Vec<&Path> = parent
            .ancestors()
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect();
        dirs.reverse();

        let mut files = Vec::new();
        for dir in dirs {
            let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let full = self.input_dir.join(dir);
            files.push(full.join(format!("{name}.json")));
            files.push(full.join(format!("{name}.data.json")));
        }

        if let Some(stem) = relative.file_stem().map(|s| s.to_string_lossy().into_owned()) {
            let full = self.input_dir.join(parent);
            files.push(full.join(format!("{stem}.json")));
            files.push(full.join(format!("{stem}.data.json")));
        }
        files
    }
}

#[async_trait]
impl DataStore for FsDataStore {
    async fn global_data(&self, _input: &Path) -> Result<Value> {
        if let Some(data) = self.global.read().as_ref() {
            return Ok(data.clone());
        }

        let data = load_data_dir(&self.data_dir).await?;
        *self.global.write() = Some(data.clone());
        Ok(data)
    }

    async fn directory_data(&self, input: &Path) -> Result<Value> {
        let relative = relative_to(input, &self.input_dir).unwrap_or_else(|| input.to_path_buf());
        if let Some(data) = self.directories.read().get(&relative) {
            return Ok(data.clone());
        }

        let mut merged = Map::new();
        for file in self.candidate_files(&relative) {
            if let Some(Value::Object(map)) = read_json(&file).await? {
                merge_into(&mut merged, &map, true);
            }
        }

        let data = Value::Object(merged);
        self.directories.write().insert(relative, data.clone());
        Ok(data)
    }
}

/// Load every `*.json` in `dir` keyed by file stem. A missing dir is empty.
async fn load_data_dir(dir: &Path) -> Result<Value> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Value::Object(Map::new())),
        Err(err) => {
            return Err(err).with_context(|| format!("reading data directory `{}`", dir.display()));
        }
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut data = Map::new();
    for file in files {
        let Some(stem) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        if let Some(value) = read_json(&file).await? {
            data.insert(stem, value);
        }
    }
    Ok(Value::Object(data))
}

/// Parse a JSON file, `None` if it does not exist.
async fn read_json(path: &Path) -> Result<Option<Value>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("reading `{}`", path.display())),
    };
    let value = serde_json::from_str(&content)
        .with_context(|| format!("parsing data file `{}`", path.display()))?;
    Ok(Some(value))
}

// ============================================================================
// In-memory store
// ============================================================================

/// Fixed data, for virtual sites and tests.
///
/// Directory entries apply to every input path under their directory;
/// deeper directories win.
#[derive(Debug, Clone)]
pub struct StaticDataStore {
    global: Value,
    directories: Vec<(PathBuf, Value)>,
}

impl Default for StaticDataStore {
    fn default() -> Self {
        Self {
            global: Value::Object(Map::new()),
            directories: Vec::new(),
        }
    }
}

impl StaticDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, data: Value) -> Self {
        self.global = data;
        self
    }

    pub fn with_directory(mut self, dir: impl Into<PathBuf>, data: Value) -> Self {
        self.directories.push((dir.into(), data));
        self
    }
}

#[async_trait]
impl DataStore for StaticDataStore {
    async fn global_data(&self, _input: &Path) -> Result<Value> {
        Ok(self.global.clone())
    }

    async fn directory_data(&self, input: &Path) -> Result<Value> {
        let mut applicable: Vec<&(PathBuf, Value)> = self
            .directories
            .iter()
            .filter(|(dir, _)| input.starts_with(dir))
            .collect();
        applicable.sort_by_key(|(dir, _)| dir.components().count());

        let mut merged = Map::new();
        for (_, data) in applicable {
            if let Value::Object(map) = data {
                merge_into(&mut merged, map, true);
            }
        }
        Ok(Value::Object(merged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn make_config(root: &Path) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.build.root = Some(root.to_path_buf());
        config.build.input = PathBuf::from("src");
        config
    }

    #[tokio::test]
    async fn test_global_data_keyed_by_stem() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("src/_data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(data_dir.join("site.json"), r#"{"title": "Blog"}"#).unwrap();
        fs::write(data_dir.join("notes.txt"), "ignored").unwrap();

        let store = FsDataStore::new(&make_config(dir.path()));
        let data = store.global_data(Path::new("x.md")).await.unwrap();
        assert_eq!(data, json!({"site": {"title": "Blog"}}));
    }

    #[tokio::test]
    async fn test_missing_data_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FsDataStore::new(&make_config(dir.path()));
        let data = store.global_data(Path::new("x.md")).await.unwrap();
        assert_eq!(data, json!({}));
    }

    #[tokio::test]
    async fn test_directory_data_deeper_wins() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("src/posts");
        fs::create_dir_all(posts.join("2024")).unwrap();
        fs::write(posts.join("posts.json"), r#"{"layout": "post", "meta": {"a": 1}}"#).unwrap();
        fs::write(posts.join("2024/2024.json"), r#"{"meta": {"b": 2}}"#).unwrap();
        fs::write(posts.join("2024/a.data.json"), r#"{"layout": "special"}"#).unwrap();

        let store = FsDataStore::new(&make_config(dir.path()));
        let input = dir.path().join("src/posts/2024/a.md");
        let data = store.directory_data(&input).await.unwrap();
        assert_eq!(
            data,
            json!({"layout": "special", "meta": {"a": 1, "b": 2}})
        );
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let posts = dir.path().join("src/posts");
        fs::create_dir_all(&posts).unwrap();
        fs::write(posts.join("posts.json"), "{ nope").unwrap();

        let store = FsDataStore::new(&make_config(dir.path()));
        let err = store
            .directory_data(&posts.join("a.md"))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("posts.json"));
    }

    #[tokio::test]
    async fn test_static_store_applies_ancestors() {
        let store = StaticDataStore::new()
            .with_global(json!({"site": "x"}))
            .with_directory("posts/2024", json!({"year": 2024}))
            .with_directory("posts", json!({"layout": "post", "year": 0}))
            .with_directory("drafts", json!({"draft": true}));

        let data = store.directory_data(Path::new("posts/2024/a.md")).await.unwrap();
        assert_eq!(data, json!({"layout": "post", "year": 2024}));
        let global = store.global_data(Path::new("posts/2024/a.md")).await.unwrap();
        assert_eq!(global, json!({"site": "x"}));
    }
}
