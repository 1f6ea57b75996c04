//! Templates: one input file and the pages it expands into.
//!
//! # Data cascade
//!
//! ```text
//!   DataStore::global_data ─┐
//!   LayoutCache chain data ─┤  check_reserved ──► merge_all ──► + excerpt
//!   DataStore::dir_data    ─┤   (all sources)     (later wins)    + page.*
//!   front matter           ─┘                                     + folio.*
//! ```
//!
//! # Expansion
//!
//! ```text
//! get_data() ──► expand(data)
//!                   ├─ not paginated ─► computed phase 1 ─► 1 PageEntry
//!                   └─ paginated ─────► Paginator ─► N sub-templates
//!                                         └─ computed phase 1 each ─► N PageEntry
//! ```
//!
//! # Caches
//!
//! Each template memoizes its raw input, front matter and merged data
//! ([`CacheCategory::Data`]) and its rendered and final content
//! ([`CacheCategory::Render`]). [`Template::invalidate`] clears whole
//! categories.

mod date;
mod entry;
mod layout;
mod pagination;

pub use entry::PageEntry;
pub use layout::{FileLayout, Layout, LayoutCache};
pub use pagination::{ChunkPaginator, PaginatedPage, Paginator};

use crate::computed::{ComputedData, ComputedHost, PAGE_OUTPUT_PATH_KEY, PAGE_URL_KEY};
use crate::context::SiteContext;
use crate::data::{check_reserved, get_path, has_path, merge_all, set_path};
use crate::engine::{Content, Engine, FrontMatter};
use crate::error::DataCascadeError;
use crate::permalink::{OutputLocation, PermalinkResolver};
use crate::utils::date::to_rfc3339;
use crate::utils::slug::{file_path_stem, file_slug, relative_to};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use futures::future::try_join_all;
use parking_lot::RwLock;
use serde_json::{Map, Value, json};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Generator namespace attached to every page.
pub const GENERATOR_KEY: &str = "folio";

/// Which memoized values [`Template::invalidate`] drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCategory {
    /// Raw input, front matter and merged data.
    Data,
    /// Rendered and final content.
    Render,
}

/// Where a template comes from.
#[derive(Debug)]
pub struct TemplateInput {
    /// Location on disk.
    pub path: PathBuf,
    /// Path relative to the input directory.
    pub relative: PathBuf,
    /// `page.inputPath`, e.g. `src/posts/a.md`.
    pub input_path: String,
    /// In-memory source of a virtual template.
    pub source: Option<String>,
}

#[derive(Default, Clone)]
struct TemplateCache {
    raw: Option<Arc<str>>,
    front_matter: Option<Arc<FrontMatter>>,
    data: Option<Value>,
    rendered: Option<Arc<Content>>,
    final_content: Option<Arc<Content>>,
}

pub struct Template {
    input: Arc<TemplateInput>,
    engine: Arc<dyn Engine>,
    ctx: Arc<SiteContext>,
    extra_output_subdir: Option<String>,
    cache: RwLock<TemplateCache>,
    writes: AtomicUsize,
}

impl Template {
    /// A template backed by a file. `path` is absolute or relative to the
    /// input directory.
    pub fn new(path: impl AsRef<Path>, ctx: &Arc<SiteContext>) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let input_dir = ctx.config.input_dir();
        let relative = if path.is_absolute() {
            let normalized_dir = input_dir.canonicalize().unwrap_or_else(|_| input_dir.clone());
            relative_to(path, &input_dir)
                .or_else(|| relative_to(path, &normalized_dir))
                .ok_or_else(|| {
                    anyhow!(
                        "`{}` is outside the input directory `{}`",
                        path.display(),
                        input_dir.display()
                    )
                })?
        } else {
            relative_to(path, &input_dir).unwrap_or_else(|| path.to_path_buf())
        };
        Self::build(relative, None, ctx)
    }

    /// A template with in-memory source; nothing is read from disk.
    pub fn new_virtual(
        relative: impl AsRef<Path>,
        source: impl Into<String>,
        ctx: &Arc<SiteContext>,
    ) -> Result<Arc<Self>> {
        let relative = relative_to(relative.as_ref(), Path::new(""))
            .unwrap_or_else(|| relative.as_ref().to_path_buf());
        Self::build(relative, Some(source.into()), ctx)
    }

    fn build(relative: PathBuf, source: Option<String>, ctx: &Arc<SiteContext>) -> Result<Arc<Self>> {
        let engine = ctx.engines.for_path(&relative).ok_or_else(|| {
            anyhow!("no engine handles `{}`", relative.display())
        })?;
        let input = TemplateInput {
            path: ctx.config.input_dir().join(&relative),
            input_path: display_input_path(&ctx.config.build.input, &relative),
            relative,
            source,
        };
        Ok(Arc::new(Self {
            input: Arc::new(input),
            engine,
            ctx: Arc::clone(ctx),
            extra_output_subdir: None,
            cache: RwLock::new(TemplateCache::default()),
            writes: AtomicUsize::new(0),
        }))
    }

    /// A sibling template for one paginated page, sharing input and data.
    pub fn for_page(&self, extra_output_subdir: Option<String>) -> Arc<Self> {
        let cached = self.cache.read().clone();
        let cache = TemplateCache {
            rendered: None,
            final_content: None,
            ..cached
        };
        Arc::new(Self {
            input: Arc::clone(&self.input),
            engine: Arc::clone(&self.engine),
            ctx: Arc::clone(&self.ctx),
            extra_output_subdir,
            cache: RwLock::new(cache),
            writes: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub fn input_path(&self) -> &str {
        &self.input.input_path
    }

    #[inline]
    pub fn relative_path(&self) -> &Path {
        &self.input.relative
    }

    #[inline]
    pub fn disk_path(&self) -> &Path {
        &self.input.path
    }

    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.input.source.is_some()
    }

    #[inline]
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    #[inline]
    pub fn context(&self) -> &Arc<SiteContext> {
        &self.ctx
    }

    pub fn extra_output_subdir(&self) -> Option<&str> {
        self.extra_output_subdir.as_deref()
    }

    /// Files written for this template.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop memoized values in `categories`.
    pub fn invalidate(&self, categories: &[CacheCategory]) {
        let mut cache = self.cache.write();
        for category in categories {
            match category {
                CacheCategory::Data => {
                    cache.raw = None;
                    cache.front_matter = None;
                    cache.data = None;
                }
                CacheCategory::Render => {
                    cache.rendered = None;
                    cache.final_content = None;
                }
            }
        }
    }

    // ========================================================================
    // Data
    // ========================================================================

    pub async fn raw_input(&self) -> Result<Arc<str>> {
        if let Some(raw) = self.cache.read().raw.clone() {
            return Ok(raw);
        }
        let raw: Arc<str> = match &self.input.source {
            Some(source) => Arc::from(source.as_str()),
            None => tokio::fs::read_to_string(&self.input.path)
                .await
                .with_context(|| format!("reading template `{}`", self.input.path.display()))?
                .into(),
        };
        self.cache.write().raw = Some(Arc::clone(&raw));
        Ok(raw)
    }

    pub async fn front_matter(&self) -> Result<Arc<FrontMatter>> {
        if let Some(front_matter) = self.cache.read().front_matter.clone() {
            return Ok(front_matter);
        }
        let raw = self.raw_input().await?;
        let front_matter = Arc::new(
            self.engine
                .parse_front_matter(&raw)
                .with_context(|| format!("parsing front matter of `{}`", self.input_path()))?,
        );
        self.cache.write().front_matter = Some(Arc::clone(&front_matter));
        Ok(front_matter)
    }

    /// The merged data cascade, memoized until [`CacheCategory::Data`] is
    /// invalidated.
    pub async fn get_data(&self) -> Result<Value> {
        if let Some(data) = self.cache.read().data.clone() {
            return Ok(data);
        }

        let config = &self.ctx.config;
        let store = &self.ctx.data_store;
        let relative = self.relative_path();
        let (front_matter, global, directory) = tokio::try_join!(
            self.front_matter(),
            store.global_data(relative),
            store.directory_data(relative),
        )?;

        let layout_key = config.data.layout_key.as_str();
        let layout = [&front_matter.data, &directory, &global]
            .into_iter()
            .find_map(|source| source.get(layout_key).and_then(Value::as_str))
            .filter(|key| !key.is_empty());
        let layout_data = match layout {
            Some(key) => self.ctx.layouts.get(key, &self.ctx).await?.data().clone(),
            None => Value::Object(Map::new()),
        };

        let sources = [&global, &layout_data, &directory, &front_matter.data];
        check_reserved(sources, &config.data.reserved).map_err(|violation| {
            DataCascadeError::Reserved {
                input: PathBuf::from(self.input_path()),
                violation,
            }
        })?;
        let mut data = merge_all(sources, config.data.deep_merge);

        if let Some(excerpt) = &front_matter.excerpt
            && !config.data.excerpt_key.is_empty()
        {
            set_path(&mut data, &config.data.excerpt_key, Value::String(excerpt.clone()));
        }

        let date = date::mapped_date(self, &data).await?;
        let raw = self.raw_input().await?;
        set_path(&mut data, "page.inputPath", json!(self.input_path()));
        set_path(&mut data, "page.fileSlug", json!(file_slug(relative)));
        set_path(&mut data, "page.filePathStem", json!(file_path_stem(relative)));
        set_path(
            &mut data,
            "page.outputFileExtension",
            json!(self.engine.default_output_extension()),
        );
        set_path(&mut data, "page.templateSyntax", json!(self.engine.name()));
        set_path(&mut data, "page.rawInput", json!(&*raw));
        set_path(&mut data, "page.date", json!(to_rfc3339(&date)));
        set_path(
            &mut data,
            GENERATOR_KEY,
            json!({
                "version": env!("CARGO_PKG_VERSION"),
                "generator": concat!("folio v", env!("CARGO_PKG_VERSION")),
            }),
        );

        self.cache.write().data = Some(data.clone());
        Ok(data)
    }

    // ========================================================================
    // Location and expansion
    // ========================================================================

    pub async fn resolve_location(&self, data: &Value) -> Result<OutputLocation> {
        PermalinkResolver {
            engine: &*self.engine,
            config: &self.ctx.config,
            hooks: &self.ctx.hooks,
            input_path: Path::new(self.input_path()),
            relative: self.relative_path(),
            extra_output_subdir: self.extra_output_subdir(),
        }
        .resolve(data)
        .await
    }

    /// Merge the cascade and expand it into page entries.
    pub async fn page_entries(self: &Arc<Self>) -> Result<Vec<PageEntry>> {
        let data = self.get_data().await?;
        self.expand(data).await
    }

    /// One page entry, or one per page when the data paginates.
    ///
    /// Any page failing fails the whole expansion.
    pub async fn expand(self: &Arc<Self>, data: Value) -> Result<Vec<PageEntry>> {
        let paginator = Arc::clone(&self.ctx.paginator);
        if !paginator.is_paginated(&data) {
            return Ok(vec![self.entry(data, 0, 0).await?]);
        }

        let pages = paginator.paginate(self, &data).await?;
        try_join_all(pages.into_iter().map(|page| async move {
            page.template
                .entry(page.data, page.page_number, page.group_number)
                .await
        }))
        .await
    }

    async fn entry(
        self: &Arc<Self>,
        mut data: Value,
        page_number: usize,
        group_number: usize,
    ) -> Result<PageEntry> {
        let computed_key = self.ctx.config.data.computed_key.as_str();
        let computed = match get_path(&data, computed_key).cloned() {
            Some(tree) => {
                let host: &Template = self;
                let mut computed = ComputedData::new();
                computed.add_tree(&tree, host);
                computed.add_location_entries(&data);
                computed.setup_data(&mut data, host).await?;
                Some(computed)
            }
            None => {
                if !(has_path(&data, PAGE_URL_KEY) && has_path(&data, PAGE_OUTPUT_PATH_KEY)) {
                    let location = self.resolve_location(&data).await?;
                    set_path(&mut data, PAGE_URL_KEY, location.url_value());
                    set_path(&mut data, PAGE_OUTPUT_PATH_KEY, location.output_path_value());
                }
                None
            }
        };

        let raw_input = self.raw_input().await?;
        Ok(PageEntry::new(
            Arc::clone(self),
            raw_input,
            data,
            page_number,
            group_number,
            computed,
        ))
    }

    // ========================================================================
    // Render caches
    // ========================================================================

    /// Render the template body without layouts, memoized.
    pub(crate) async fn render_content(&self, data: &Value) -> Result<Arc<Content>> {
        if let Some(rendered) = self.cache.read().rendered.clone() {
            return Ok(rendered);
        }
        let front_matter = self.front_matter().await?;
        let content = Arc::new(
            self.engine
                .render(&front_matter.body, data, false)
                .await
                .with_context(|| format!("rendering `{}`", self.input_path()))?,
        );
        self.cache.write().rendered = Some(Arc::clone(&content));
        Ok(content)
    }

    pub(crate) fn cached_rendered(&self) -> Option<Arc<Content>> {
        self.cache.read().rendered.clone()
    }

    pub(crate) fn cached_final_content(&self) -> Option<Arc<Content>> {
        self.cache.read().final_content.clone()
    }

    pub(crate) fn set_final_content(&self, content: Arc<Content>) {
        self.cache.write().final_content = Some(content);
    }
}

#[async_trait]
impl ComputedHost for Template {
    async fn render_string(&self, source: &str, data: &Value) -> Result<String> {
        match self.engine.render(source, data, true).await? {
            Content::Text(text) => Ok(text),
            other => bail!(
                "engine `{}` rendered {} for a computed value of `{}`",
                self.engine.name(),
                other.kind(),
                self.input_path()
            ),
        }
    }

    async fn resolve_location(&self, data: &Value) -> Result<OutputLocation> {
        Template::resolve_location(self, data).await
    }

    fn symbols(&self, source: &str) -> Vec<String> {
        self.engine.symbols(source)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("input_path", &self.input.input_path)
            .field("engine", &self.engine.name())
            .field("extra_output_subdir", &self.extra_output_subdir)
            .finish_non_exhaustive()
    }
}

/// `input/relative` with `/` separators and no `./` noise.
fn display_input_path(input: &Path, relative: &Path) -> String {
    input
        .join(relative)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::RootDir => Some(String::new()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
