//! Programmatic pipeline extensions.
//!
//! Transforms, linters and URL transforms are plain closures, so they are
//! registered in code rather than `folio.toml`:
//!
//! ```ignore
//! let hooks = Hooks::new()
//!     .transform("trim", |content, _ctx| Ok(content.trim().to_owned()))
//!     .linter("no-todo", |content, ctx| {
//!         anyhow::ensure!(!content.contains("TODO"), "TODO left in {}", ctx.input_path.display());
//!         Ok(())
//!     })
//!     .url_transform(|ctx| ctx.url.strip_prefix("/drafts").map(str::to_owned));
//! ```

use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a transform or linter knows about the page it runs on.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub input_path: PathBuf,
    /// `None` when the page is never written.
    pub output_path: Option<String>,
    pub url: Option<String>,
}

/// Input of a URL transform.
#[derive(Debug, Clone, Copy)]
pub struct UrlTransformContext<'a> {
    pub url: &'a str,
    pub input_path: &'a Path,
}

pub type TransformFn = Arc<dyn Fn(&str, &HookContext) -> Result<String> + Send + Sync>;
pub type LinterFn = Arc<dyn Fn(&str, &HookContext) -> Result<()> + Send + Sync>;
pub type UrlTransformFn = Arc<dyn Fn(&UrlTransformContext<'_>) -> Option<String> + Send + Sync>;

/// A named content rewrite, run after rendering in registration order.
#[derive(Clone)]
pub struct Transform {
    pub name: String,
    func: TransformFn,
}

impl Transform {
    #[inline]
    pub fn run(&self, content: &str, ctx: &HookContext) -> Result<String> {
        (self.func)(content, ctx)
    }
}

/// A named content check. Failures are reported, never fatal.
#[derive(Clone)]
pub struct Linter {
    pub name: String,
    func: LinterFn,
}

impl Linter {
    #[inline]
    pub fn run(&self, content: &str, ctx: &HookContext) -> Result<()> {
        (self.func)(content, ctx)
    }
}

/// Every registered extension.
#[derive(Clone, Default)]
pub struct Hooks {
    transforms: Vec<Transform>,
    linters: Vec<Linter>,
    url_transforms: Vec<UrlTransformFn>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transform<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, &HookContext) -> Result<String> + Send + Sync + 'static,
    {
        self.transforms.push(Transform {
            name: name.into(),
            func: Arc::new(func),
        });
        self
    }

    pub fn linter<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str, &HookContext) -> Result<()> + Send + Sync + 'static,
    {
        self.linters.push(Linter {
            name: name.into(),
            func: Arc::new(func),
        });
        self
    }

    /// Register a URL rewrite. Returning `None` keeps the URL unchanged.
    pub fn url_transform<F>(mut self, func: F) -> Self
    where
        F: Fn(&UrlTransformContext<'_>) -> Option<String> + Send + Sync + 'static,
    {
        self.url_transforms.push(Arc::new(func));
        self
    }

    #[inline]
    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    #[inline]
    pub fn linters(&self) -> &[Linter] {
        &self.linters
    }

    /// Run every URL transform in order over `url`.
    pub fn apply_url_transforms(&self, url: &str, input_path: &Path) -> String {
        self.url_transforms
            .iter()
            .fold(url.to_owned(), |current, func| {
                func(&UrlTransformContext {
                    url: &current,
                    input_path,
                })
                .unwrap_or(current)
            })
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("transforms", &self.transforms.iter().map(|t| &t.name).collect::<Vec<_>>())
            .field("linters", &self.linters.iter().map(|l| &l.name).collect::<Vec<_>>())
            .field("url_transforms", &self.url_transforms.len())
            .finish()
    }
}
