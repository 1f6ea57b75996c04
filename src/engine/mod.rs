//! Template engines.
//!
//! An [`Engine`] turns a template body plus page data into [`Content`]. The
//! page pipeline only talks to engines through this trait:
//!
//! ```text
//! raw input ──► parse_front_matter() ──► FrontMatter { data, excerpt, body }
//!                                                    │
//!                     page data (cascade) ───────────┤
//!                                                    ▼
//!                        render(body, data, bypass_markdown) ──► Content
//! ```
//!
//! Engines are looked up by file extension through [`EngineRegistry`].

mod simple;

pub use simple::{SimpleEngine, Syntax};

use crate::permalink::Permalink;
use anyhow::{Result, bail};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Content
// ============================================================================

/// Rendered output of an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
    /// Structured data; cannot be written as a page.
    Data(Value),
}

impl Content {
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Binary(bytes) => bytes.is_empty(),
            Self::Data(value) => value.is_null(),
        }
    }

    /// Short name of the variant, for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary content",
            Self::Data(_) => "structured data",
        }
    }

    /// Content as a data value (`content` key of layouts).
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Binary(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
            Self::Data(value) => value.clone(),
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Binary(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Self::Data(value) => write!(f, "{value}"),
        }
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Binary(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
            Self::Data(value) => value.serialize(serializer),
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// A template's front matter split from its body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    /// Always an object.
    pub data: Value,
    pub excerpt: Option<String>,
    pub body: String,
}

/// Content/template engine collaborator.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Engine name, reported as `page.templateSyntax`.
    fn name(&self) -> &str;

    /// Extensions (without dot) this engine handles.
    fn file_extensions(&self) -> &[&'static str];

    fn default_output_extension(&self) -> &str {
        "html"
    }

    fn parse_front_matter(&self, raw: &str) -> Result<FrontMatter>;

    /// Render `source` against `data`. `bypass_markdown` skips markup
    /// conversion and only interpolates.
    async fn render(&self, source: &str, data: &Value, bypass_markdown: bool) -> Result<Content>;

    /// Render a permalink template to a plain string.
    async fn render_permalink(&self, source: &str, data: &Value) -> Result<String> {
        match self.render(source, data, true).await? {
            Content::Text(text) => Ok(text),
            other => bail!(
                "engine `{}` rendered {} for a permalink",
                self.name(),
                other.kind()
            ),
        }
    }

    /// Permalink the engine supplies when a page declares none.
    fn permalink_hook(&self) -> Option<Permalink> {
        None
    }

    /// Data paths `source` reads, for dependency inference.
    fn symbols(&self, source: &str) -> Vec<String>;
}

/// Engines keyed by file extension.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    by_extension: FxHashMap<String, Arc<dyn Engine>>,
    extensions: Vec<String>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Markdown and HTML through [`SimpleEngine`].
    pub fn with_defaults() -> Self {
        Self::new()
            .register(Arc::new(SimpleEngine::new(Syntax::Markdown)))
            .register(Arc::new(SimpleEngine::new(Syntax::Html)))
    }

    /// Register `engine` for its extensions; later registrations win.
    pub fn register(mut self, engine: Arc<dyn Engine>) -> Self {
        for ext in engine.file_extensions() {
            if !self.extensions.iter().any(|e| e == ext) {
                self.extensions.push((*ext).to_owned());
            }
            self.by_extension.insert((*ext).to_owned(), Arc::clone(&engine));
        }
        self
    }

    pub fn for_extension(&self, ext: &str) -> Option<Arc<dyn Engine>> {
        self.by_extension.get(&ext.to_ascii_lowercase()).cloned()
    }

    pub fn for_path(&self, path: &Path) -> Option<Arc<dyn Engine>> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.for_extension(ext))
    }

    /// Registered extensions in registration order.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("extensions", &self.extensions)
            .finish()
    }
}
