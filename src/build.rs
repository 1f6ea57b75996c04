//! Build orchestration for a set of input templates.
//!
//! # Architecture
//!
//! ```text
//! build_pages()
//!     │
//!     ├── expand_templates()
//!     │       │
//!     │       └── every input → page entries (computed phase 1)
//!     │
//!     ├── Collections::build() ──► collections.all / collections.<tag>
//!     │
//!     ├── process_remaining_data()
//!     │       │
//!     │       └── every entry: attach collections, computed phase 2
//!     │
//!     └── write_all() ──► files, JSON records or NDJSON lines
//! ```
//!
//! Everything before `write_all` fails the whole build; after it, failures
//! are reported per page.

use crate::collections::Collections;
use crate::context::SiteContext;
use crate::log;
use crate::pipeline::{BatchReport, write_all};
use crate::template::{PageEntry, Template};
use anyhow::{Context, Result};
use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWrite;

/// Expand, collect, finish and write every input.
pub async fn build_pages(
    ctx: &Arc<SiteContext>,
    inputs: &[PathBuf],
    sink: Option<&mut (dyn AsyncWrite + Unpin + Send)>,
) -> Result<BatchReport> {
    let templates = inputs
        .iter()
        .map(|input| Template::new(input, ctx))
        .collect::<Result<Vec<_>>>()?;
    let mut entries = expand_templates(&templates).await?;

    let collections = Collections::build(&entries);
    log!(
        "data";
        "{} page entries, {} tagged collections",
        entries.len(),
        collections.tags().count()
    );
    let collections = collections.to_value();
    try_join_all(
        entries
            .iter_mut()
            .map(|entry| finish_entry(entry, &collections)),
    )
    .await?;

    let report = write_all(&mut entries, sink).await?;
    log!(
        "build";
        "{} written, {} failed",
        report.results.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Page entries of every template, in input order.
pub async fn expand_templates(templates: &[Arc<Template>]) -> Result<Vec<PageEntry>> {
    let expanded = try_join_all(templates.iter().map(|template| async move {
        template
            .page_entries()
            .await
            .with_context(|| format!("expanding `{}`", template.input_path()))
    }))
    .await?;
    Ok(expanded.into_iter().flatten().collect())
}

async fn finish_entry(entry: &mut PageEntry, collections: &serde_json::Value) -> Result<()> {
    let input = entry.input_path().to_owned();
    entry
        .process_remaining_data(collections)
        .await
        .with_context(|| format!("computing data of `{input}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputMode, SiteConfig};
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_build_from_disk() {
        let dir = TempDir::new().unwrap();
        write(&dir, "src/_data/site.json", r#"{"name": "Demo"}"#);
        write(&dir, "src/_includes/base.html", "<main>{{ content }}</main>");
        write(&dir, "src/posts/posts.json", r#"{"layout": "base", "tags": "post"}"#);
        write(&dir, "src/posts/a.md", "---\ntitle: Hi\n---\n# {{ title }} on {{ site.name }}");
        write(
            &dir,
            "src/index.html",
            "---\ncomputed:\n  count: '{{ collections.post | json }}'\n---\n{{ count }}",
        );

        let mut config = SiteConfig::default();
        config.build.root = Some(dir.path().to_path_buf());
        let ctx = SiteContext::new(config).into_shared();
        let inputs = [PathBuf::from("posts/a.md"), PathBuf::from("index.html")];
        let report = build_pages(&ctx, &inputs, None).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.results.len(), 2);
        let post = std::fs::read_to_string(dir.path().join("_site/posts/a/index.html")).unwrap();
        assert_eq!(post, "<main><h1>Hi on Demo</h1>\n</main>");
        let index = std::fs::read_to_string(dir.path().join("_site/index.html")).unwrap();
        assert!(index.contains("src/posts/a.md"));
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_writing() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.build.root = Some(dir.path().to_path_buf());
        config.build.output_mode = OutputMode::Json;
        let ctx = SiteContext::new(config).into_shared();
        let err = build_pages(&ctx, &[PathBuf::from("nope.md")], None)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("nope.md"));
    }
}
