//! Render, lint, transform and write page entries.
//!
//! # Flow
//!
//! ```text
//! PageEntry ──► render_page_entry()
//!                 ├─ template content (cached on the template)
//!                 ├─ layout chain
//!                 ├─ linters (spawned, failures only logged)
//!                 └─ transforms (in order, first failure stops)
//!                        │
//!                        ▼ final content (cached on the template)
//!               write()
//!                 ├─ fs      ──► <output>/.../index.html
//!                 ├─ json    ──► WriteResult collected
//!                 └─ ndjson  ──► WriteResult streamed
//! ```
//!
//! [`write_all`] fans out over many entries; one failing entry does not stop
//! the others.

use crate::config::{HookContext, Hooks};
use crate::data::path::select_paths;
use crate::engine::Content;
use crate::error::{ContentAccessError, InvalidRenderOutput, TransformFailure};
use crate::log;
use crate::template::{Layout, PageEntry};
use anyhow::{Context, Result};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// What was (or in reporting modes, would be) written for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub url: String,
    pub input_path: String,
    pub output_path: String,
    pub raw_input: String,
    pub content: Content,
    /// Values of the configured selector paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A page entry that failed somewhere in the pipeline.
#[derive(Debug)]
pub struct PageFailure {
    pub input_path: String,
    pub error: anyhow::Error,
}

/// Outcome of [`write_all`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// In entry order.
    pub results: Vec<WriteResult>,
    pub failures: Vec<PageFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn hook_context(entry: &PageEntry) -> HookContext {
    HookContext {
        input_path: PathBuf::from(entry.input_path()),
        output_path: entry.output_path().map(str::to_owned),
        url: entry.url().map(str::to_owned),
    }
}

/// Render an entry to its final content.
///
/// The result is cached on the entry's template; later calls return it
/// without running layouts, linters or transforms again.
pub async fn render_page_entry(entry: &mut PageEntry) -> Result<Arc<Content>> {
    let template = Arc::clone(&entry.template);
    if let Some(content) = template.cached_final_content() {
        if !entry.has_template_content()
            && let Some(rendered) = template.cached_rendered()
        {
            entry.set_template_content(rendered);
        }
        return Ok(content);
    }

    if !entry.behavior.render {
        return Err(ContentAccessError::Unrenderable {
            input: PathBuf::from(entry.input_path()),
        }
        .into());
    }

    let rendered = template.render_content(&entry.data).await?;
    entry.set_template_content(Arc::clone(&rendered));

    let ctx = template.context();
    let layout_key = entry
        .data
        .get(ctx.config.data.layout_key.as_str())
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty());
    let content = match layout_key {
        Some(key) => {
            let layout = ctx.layouts.get(key, ctx).await?;
            layout.render_page_entry(entry).await?
        }
        None => Content::clone(&rendered),
    };

    let hook_ctx = hook_context(entry);
    if let Content::Text(text) = &content {
        spawn_linters(&ctx.hooks, text, &hook_ctx);
    }
    let content = Arc::new(run_transforms(&ctx.hooks, content, &hook_ctx)?);

    template.set_final_content(Arc::clone(&content));
    Ok(content)
}

/// Run every linter on its own task. Failures are logged, never returned.
fn spawn_linters(hooks: &Hooks, content: &str, hook_ctx: &HookContext) {
    if hooks.linters().is_empty() {
        return;
    }
    let content: Arc<str> = Arc::from(content);
    for linter in hooks.linters().iter().cloned() {
        let content = Arc::clone(&content);
        let hook_ctx = hook_ctx.clone();
        tokio::spawn(async move {
            if let Err(err) = linter.run(&content, &hook_ctx) {
                log!("lint"; "{} ({}): {err:#}", hook_ctx.input_path.display(), linter.name);
            }
        });
    }
}

/// Apply transforms in registration order to text content.
fn run_transforms(hooks: &Hooks, content: Content, hook_ctx: &HookContext) -> Result<Content> {
    let Content::Text(mut text) = content else {
        return Ok(content);
    };
    for transform in hooks.transforms() {
        let was_empty = text.is_empty();
        text = transform
            .run(&text, hook_ctx)
            .map_err(|source| TransformFailure {
                name: transform.name.clone(),
                input: hook_ctx.input_path.clone(),
                output: hook_ctx.output_path.clone().unwrap_or_default(),
                source,
            })?;
        if !was_empty && text.is_empty() {
            log!(
                "warn";
                "transform `{}` emptied the content of `{}`",
                transform.name,
                hook_ctx.input_path.display()
            );
        }
    }
    Ok(Content::Text(text))
}

/// Write `content` for `entry`.
///
/// Returns `None` in dry runs and for entries that are not written. In
/// reporting modes nothing touches the filesystem, but the result is still
/// produced.
pub async fn write(entry: &PageEntry, content: &Content) -> Result<Option<WriteResult>> {
    let ctx = entry.template.context();
    let config = &ctx.config;
    if config.build.dry_run || !entry.behavior.write {
        return Ok(None);
    }
    let (Some(output_path), Some(url)) = (entry.output_path(), entry.url()) else {
        return Ok(None);
    };

    let bytes: &[u8] = match content {
        Content::Text(text) => text.as_bytes(),
        Content::Binary(bytes) => bytes,
        Content::Data(_) => {
            return Err(InvalidRenderOutput {
                engine: entry.template.engine().name().to_owned(),
                input: PathBuf::from(entry.input_path()),
                found: content.kind(),
            }
            .into());
        }
    };

    if config.build.output_mode.writes_files() {
        let target = config.resolve_output(output_path);
        if let Some(parent) = target.parent() {
            ctx.existence.ensure_dir(parent).await?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("writing `{}`", target.display()))?;
        entry.template.record_write();
    }

    log!("write"; "{} -> {}", entry.input_path(), output_path);

    let data = (!config.data.selectors.is_empty())
        .then(|| select_paths(&entry.data, &config.data.selectors));
    Ok(Some(WriteResult {
        url: url.to_owned(),
        input_path: entry.input_path().to_owned(),
        output_path: output_path.to_owned(),
        raw_input: entry.raw_input.to_string(),
        content: content.clone(),
        data,
    }))
}

async fn render_and_write(entry: &mut PageEntry) -> Result<Option<WriteResult>> {
    if !entry.behavior.render {
        return Ok(None);
    }
    let content = render_page_entry(entry).await?;
    write(entry, &content).await
}

/// Render and write every entry concurrently.
///
/// With a `sink`, each result is streamed as one JSON line as soon as its
/// entry finishes. Entries whose permalink disables rendering are skipped.
pub async fn write_all(
    entries: &mut [PageEntry],
    mut sink: Option<&mut (dyn AsyncWrite + Unpin + Send)>,
) -> Result<BatchReport> {
    let mut pending: FuturesUnordered<_> = entries
        .iter_mut()
        .enumerate()
        .map(|(index, entry)| async move {
            let input_path = entry.input_path().to_owned();
            (index, input_path, render_and_write(entry).await)
        })
        .collect();

    let mut results = Vec::new();
    let mut failures = Vec::new();
    while let Some((index, input_path, outcome)) = pending.next().await {
        match outcome {
            Ok(Some(result)) => {
                if let Some(sink) = sink.as_deref_mut() {
                    let mut line = serde_json::to_vec(&result)?;
                    line.push(b'\n');
                    sink.write_all(&line).await?;
                    sink.flush().await?;
                }
                results.push((index, result));
            }
            Ok(None) => {}
            Err(error) => {
                log!("error"; "{input_path}: {error:#}");
                failures.push(PageFailure { input_path, error });
            }
        }
    }

    results.sort_by_key(|(index, _)| *index);
    Ok(BatchReport {
        results: results.into_iter().map(|(_, result)| result).collect(),
        failures,
    })
}
