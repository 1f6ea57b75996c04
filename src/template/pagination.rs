//! Pagination: one template, many pages.
//!
//! ```yaml
//! pagination:
//!   data: posts      # dotted path to an array (or object: its keys)
//!   size: 2          # items per page, default 1
//!   alias: post      # optional name for the page's items
//! ```
//!
//! Each page gets `pagination.items`, `pagination.pageNumber`,
//! `pagination.pages`, `pagination.hrefs` and `pagination.href.*`. Pages
//! after the first are written below a numbered subdirectory.

use super::Template;
use crate::computed::{PAGE_OUTPUT_PATH_KEY, PAGE_URL_KEY};
use crate::data::{get_path, set_path};
use crate::permalink::OutputLocation;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub const PAGINATION_KEY: &str = "pagination";

/// Data for one page of a paginated template.
#[derive(Debug)]
pub struct PaginatedPage {
    pub template: Arc<Template>,
    pub data: Value,
    pub page_number: usize,
    pub group_number: usize,
}

#[async_trait]
pub trait Paginator: Send + Sync {
    fn is_paginated(&self, data: &Value) -> bool;

    async fn paginate(&self, template: &Arc<Template>, data: &Value) -> Result<Vec<PaginatedPage>>;
}

#[derive(Debug, Deserialize)]
struct PaginationSettings {
    data: String,
    #[serde(default = "default_size")]
    size: usize,
    #[serde(default)]
    alias: Option<String>,
}

const fn default_size() -> usize {
    1
}

/// Fixed-size chunks of a data array.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkPaginator;

#[async_trait]
impl Paginator for ChunkPaginator {
    fn is_paginated(&self, data: &Value) -> bool {
        get_path(data, "pagination.data").is_some_and(Value::is_string)
    }

    async fn paginate(&self, template: &Arc<Template>, data: &Value) -> Result<Vec<PaginatedPage>> {
        let input = template.input_path();
        let settings: PaginationSettings = data
            .get(PAGINATION_KEY)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .with_context(|| format!("invalid `pagination` in `{input}`"))?
            .context("missing `pagination`")?;
        if settings.size == 0 {
            bail!("`pagination.size` of `{input}` must be at least 1");
        }

        let items: Vec<Value> = match get_path(data, &settings.data) {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Object(map)) => map.keys().cloned().map(Value::String).collect(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => bail!(
                "`pagination.data` of `{input}` points at `{other}`, expected an array or object"
            ),
        };
        let chunks: Vec<Vec<Value>> = items.chunks(settings.size).map(<[Value]>::to_vec).collect();

        let mut pages: Vec<(Arc<Template>, Value)> = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let template = template.for_page((index > 0).then(|| index.to_string()));
            let mut page_data = data.clone();
            set_path(&mut page_data, "pagination.items", Value::Array(chunk.clone()));
            set_path(&mut page_data, "pagination.pageNumber", json!(index));
            set_path(&mut page_data, "pagination.pages", json!(chunks));
            if let Some(alias) = &settings.alias {
                let value = match chunk.as_slice() {
                    [only] if settings.size == 1 => only.clone(),
                    _ => Value::Array(chunk.clone()),
                };
                set_path(&mut page_data, alias, value);
            }
            pages.push((template, page_data));
        }

        let locations = try_join_all(
            pages
                .iter()
                .map(|(template, page_data)| template.resolve_location(page_data)),
        )
        .await?;
        let hrefs: Vec<Value> = locations.iter().map(OutputLocation::url_value).collect();
        let href = |index: Option<usize>| {
            index
                .and_then(|i| hrefs.get(i))
                .cloned()
                .unwrap_or(Value::Null)
        };

        let last = hrefs.len().saturating_sub(1);
        Ok(pages
            .into_iter()
            .zip(locations)
            .enumerate()
            .map(|(index, ((template, mut page_data), location))| {
                set_path(&mut page_data, "pagination.hrefs", Value::Array(hrefs.clone()));
                set_path(&mut page_data, "pagination.href.previous", href(index.checked_sub(1)));
                set_path(&mut page_data, "pagination.href.next", href(Some(index + 1)));
                set_path(&mut page_data, "pagination.href.first", href(Some(0)));
                set_path(&mut page_data, "pagination.href.last", href(Some(last)));
                set_path(&mut page_data, PAGE_URL_KEY, location.url_value());
                set_path(&mut page_data, PAGE_OUTPUT_PATH_KEY, location.output_path_value());
                PaginatedPage {
                    template,
                    data: page_data,
                    page_number: index,
                    group_number: 0,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::context::SiteContext;
    use crate::data::StaticDataStore;

    async fn paginate(source: &str, global: Value) -> Result<Vec<PaginatedPage>> {
        let ctx = SiteContext::new(SiteConfig::default())
            .with_data_store(Arc::new(StaticDataStore::new().with_global(global)))
            .into_shared();
        let template = Template::new_virtual("list.md", source, &ctx)?;
        let data = template.get_data().await?;
        ChunkPaginator.paginate(&template, &data).await
    }

    #[tokio::test]
    async fn test_chunks_and_hrefs() {
        let pages = paginate(
            "---\npagination:\n  data: posts\n  size: 2\n---\n",
            json!({"posts": ["a", "b", "c"]}),
        )
        .await
        .unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].data["pagination"]["items"], json!(["a", "b"]));
        assert_eq!(pages[1].data["pagination"]["items"], json!(["c"]));
        assert_eq!(pages[0].data["page"]["url"], json!("/list/"));
        assert_eq!(pages[1].data["page"]["url"], json!("/list/1/"));
        assert_eq!(pages[1].data["pagination"]["href"]["previous"], json!("/list/"));
        assert_eq!(pages[1].data["pagination"]["href"]["next"], Value::Null);
        assert_eq!(pages[0].data["pagination"]["href"]["last"], json!("/list/1/"));
        assert_eq!(pages[1].page_number, 1);
        assert_eq!(pages[1].template.extra_output_subdir(), Some("1"));
    }

    #[tokio::test]
    async fn test_alias_and_object_keys() {
        let pages = paginate(
            "---\npagination:\n  data: tags\n  alias: tag\n---\n",
            json!({"tags": {"rust": 1, "go": 2}}),
        )
        .await
        .unwrap();
        let aliases: Vec<&Value> = pages.iter().map(|p| &p.data["tag"]).collect();
        assert_eq!(aliases.len(), 2);
        assert!(aliases.contains(&&json!("rust")));
    }

    #[tokio::test]
    async fn test_empty_data_yields_no_pages() {
        let pages = paginate("---\npagination:\n  data: missing\n---\n", json!({})).await.unwrap();
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_zero_size_rejected() {
        let err = paginate("---\npagination:\n  data: posts\n  size: 0\n---\n", json!({"posts": [1]}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }
}
