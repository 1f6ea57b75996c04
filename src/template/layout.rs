//! Layouts: templates that wrap a page's rendered content.
//!
//! A layout may name a parent layout in its own front matter. The chain is
//! loaded once per key and cached; rendering wraps the page content from the
//! innermost layout outwards, exposing the previous result as `content`.

use super::PageEntry;
use crate::context::SiteContext;
use crate::data::{merge_all, set_path};
use crate::engine::{Content, Engine};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Key under which a layout sees the content it wraps.
pub const CONTENT_KEY: &str = "content";

#[async_trait]
pub trait Layout: Send + Sync {
    fn key(&self) -> &str;

    /// Data contributed to the cascade by the whole layout chain.
    fn data(&self) -> &Value;

    /// Wrap the entry's rendered template content.
    async fn render_page_entry(&self, entry: &PageEntry) -> Result<Content>;
}

/// A layout loaded from the includes directory (or registered in memory).
pub struct FileLayout {
    key: String,
    path: PathBuf,
    engine: Arc<dyn Engine>,
    /// Own front matter merged over the parent chain's data.
    data: Value,
    body: String,
    parent: Option<Arc<FileLayout>>,
}

impl FileLayout {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> Option<&Arc<FileLayout>> {
        self.parent.as_ref()
    }
}

#[async_trait]
impl Layout for FileLayout {
    fn key(&self) -> &str {
        &self.key
    }

    fn data(&self) -> &Value {
        &self.data
    }

    async fn render_page_entry(&self, entry: &PageEntry) -> Result<Content> {
        let mut content = Content::clone(entry.template_content()?);
        let mut current = Some(self);
        while let Some(layout) = current {
            let mut data = entry.data.clone();
            set_path(&mut data, CONTENT_KEY, content.to_value());
            content = layout
                .engine
                .render(&layout.body, &data, false)
                .await
                .with_context(|| format!("rendering layout `{}`", layout.key))?;
            current = layout.parent.as_deref();
        }
        Ok(content)
    }
}

impl fmt::Debug for FileLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileLayout")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("parent", &self.parent.as_ref().map(|p| p.key.as_str()))
            .finish_non_exhaustive()
    }
}

/// Parsed layout file before its parent is linked.
struct LoadedLayout {
    key: String,
    path: PathBuf,
    engine: Arc<dyn Engine>,
    data: Value,
    body: String,
    parent: Option<String>,
}

impl LoadedLayout {
    fn parse(key: &str, path: PathBuf, raw: &str, ctx: &SiteContext) -> Result<Self> {
        let engine = ctx
            .engines
            .for_path(&path)
            .ok_or_else(|| anyhow!("no engine handles layout `{}`", path.display()))?;
        let front_matter = engine
            .parse_front_matter(raw)
            .with_context(|| format!("parsing front matter of layout `{key}`"))?;
        let parent = front_matter
            .data
            .get(ctx.config.data.layout_key.as_str())
            .and_then(Value::as_str)
            .filter(|parent| !parent.is_empty())
            .map(str::to_owned);
        Ok(Self {
            key: key.to_owned(),
            path,
            engine,
            data: front_matter.data,
            body: front_matter.body,
            parent,
        })
    }

    fn link(self, parent: Option<Arc<FileLayout>>, deep: bool) -> FileLayout {
        let data = match &parent {
            Some(parent) => merge_all([&parent.data, &self.data], deep),
            None => merge_all([&self.data], deep),
        };
        FileLayout {
            key: self.key,
            path: self.path,
            engine: self.engine,
            data,
            body: self.body,
            parent,
        }
    }
}

/// Layout chains by key, loaded on first use.
#[derive(Default)]
pub struct LayoutCache {
    layouts: RwLock<FxHashMap<String, Arc<FileLayout>>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout chain starting at `key`.
    pub async fn get(&self, key: &str, ctx: &SiteContext) -> Result<Arc<FileLayout>> {
        if let Some(layout) = self.layouts.read().get(key) {
            return Ok(Arc::clone(layout));
        }

        // Walk up to the first cached ancestor (or the root), then link
        // back down.
        let mut chain: Vec<LoadedLayout> = Vec::new();
        let mut next = Some(key.to_owned());
        let mut linked: Option<Arc<FileLayout>> = None;
        while let Some(current) = next.take() {
            if let Some(start) = chain.iter().position(|l| l.key == current) {
                let mut cycle: Vec<&str> = chain[start..].iter().map(|l| l.key.as_str()).collect();
                cycle.push(&current);
                bail!("layout chain has a cycle: {}", cycle.join(" → "));
            }
            if let Some(cached) = self.layouts.read().get(&current) {
                linked = Some(Arc::clone(cached));
                break;
            }
            let loaded = load(&current, ctx).await?;
            next = loaded.parent.clone();
            chain.push(loaded);
        }

        let deep = ctx.config.data.deep_merge;
        for loaded in chain.into_iter().rev() {
            let key = loaded.key.clone();
            let layout = Arc::new(loaded.link(linked.take(), deep));
            self.layouts.write().insert(key, Arc::clone(&layout));
            linked = Some(layout);
        }
        linked.ok_or_else(|| anyhow!("layout `{key}` could not be loaded"))
    }

    /// Register an in-memory layout. `file_name` selects the engine; a parent
    /// named in its front matter must already be resolvable.
    pub async fn insert_virtual(
        &self,
        key: &str,
        file_name: &str,
        source: &str,
        ctx: &SiteContext,
    ) -> Result<Arc<FileLayout>> {
        let loaded = LoadedLayout::parse(key, PathBuf::from(file_name), source, ctx)?;
        let parent = match &loaded.parent {
            Some(parent) => Some(self.get(parent, ctx).await?),
            None => None,
        };
        let layout = Arc::new(loaded.link(parent, ctx.config.data.deep_merge));
        self.layouts.write().insert(key.to_owned(), Arc::clone(&layout));
        Ok(layout)
    }

    pub fn clear(&self) {
        self.layouts.write().clear();
    }
}

impl fmt::Debug for LayoutCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layouts = self.layouts.read();
        let mut keys: Vec<&String> = layouts.keys().collect();
        keys.sort();
        f.debug_struct("LayoutCache").field("keys", &keys).finish()
    }
}

async fn load(key: &str, ctx: &SiteContext) -> Result<LoadedLayout> {
    let dir = ctx.config.includes_dir();
    let path = find_layout_file(&dir, key, ctx.engines.extensions())
        .await
        .ok_or_else(|| anyhow!("layout `{key}` not found in `{}`", dir.display()))?;
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading layout `{}`", path.display()))?;
    LoadedLayout::parse(key, path, &raw, ctx)
}

/// `dir/key` when it names a file with an extension, else `dir/key.<ext>`
/// for the first registered extension that exists.
async fn find_layout_file(dir: &Path, key: &str, extensions: &[String]) -> Option<PathBuf> {
    let exact = dir.join(key);
    if exact.extension().is_some() && is_file(&exact).await {
        return Some(exact);
    }
    for ext in extensions {
        let candidate = dir.join(format!("{key}.{ext}"));
        if is_file(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn disk_context(dir: &TempDir) -> SiteContext {
        let mut config = SiteConfig::default();
        config.build.root = Some(dir.path().to_path_buf());
        SiteContext::new(config)
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_chain_data_and_lookup() {
        let dir = TempDir::new().unwrap();
        write(&dir, "src/_includes/base.html", "---\nsite: base\ncolor: red\n---\n<main>{{ content }}</main>");
        write(&dir, "src/_includes/post.html", "---\nlayout: base\ncolor: blue\n---\n<article>{{ content }}</article>");
        let ctx = disk_context(&dir);

        let post = ctx.layouts.get("post", &ctx).await.unwrap();
        assert_eq!(post.data(), &json!({"layout": "base", "site": "base", "color": "blue"}));
        assert_eq!(post.parent().unwrap().key(), "base");

        // Exact file names work too and share the cached parent.
        let exact = ctx.layouts.get("base.html", &ctx).await.unwrap();
        assert_eq!(exact.key(), "base.html");
    }

    #[tokio::test]
    async fn test_missing_layout() {
        let dir = TempDir::new().unwrap();
        let ctx = disk_context(&dir);
        let err = ctx.layouts.get("nope", &ctx).await.unwrap_err();
        assert!(err.to_string().contains("layout `nope` not found"));
    }

    #[tokio::test]
    async fn test_layout_cycle() {
        let dir = TempDir::new().unwrap();
        write(&dir, "src/_includes/a.html", "---\nlayout: b\n---\nA");
        write(&dir, "src/_includes/b.html", "---\nlayout: a\n---\nB");
        let ctx = disk_context(&dir);
        let err = ctx.layouts.get("a", &ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "layout chain has a cycle: a → b → a");
    }

    #[tokio::test]
    async fn test_virtual_layout_with_parent() {
        let ctx = SiteContext::new(SiteConfig::default());
        ctx.layouts
            .insert_virtual("base", "base.html", "<html>{{ content }}</html>", &ctx)
            .await
            .unwrap();
        let child = ctx
            .layouts
            .insert_virtual("child", "child.html", "---\nlayout: base\n---\n<div>{{ content }}</div>", &ctx)
            .await
            .unwrap();
        assert_eq!(child.parent().unwrap().key(), "base");
    }
}
