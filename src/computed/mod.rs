//! Computed data: values derived from the rest of a page's data.
//!
//! # Two phases
//!
//! ```text
//! cascade data ──► setup_data()              entries not touching collections
//!                     │                      (always includes page.url /
//!                     ▼                       page.outputPath)
//!               page entries built
//!                     │
//!        site-wide collections attached
//!                     │
//!                     ▼
//!              process_remaining_data()      entries reading collections.*
//! ```
//!
//! Within a phase entries run in dependency order (see [`graph`]). String
//! entries are templates; their dependencies are inferred from the symbols
//! they reference unless given explicitly.

pub mod graph;

use crate::data::{has_path, set_path};
use crate::permalink::OutputLocation;
use anyhow::Result;
use async_trait::async_trait;
use graph::{DependencyGraph, paths_overlap};
use rustc_hash::FxHashSet;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Top-level key holding site-wide collections.
pub const COLLECTIONS_KEY: &str = "collections";
pub const PAGE_URL_KEY: &str = "page.url";
pub const PAGE_OUTPUT_PATH_KEY: &str = "page.outputPath";

pub type ComputedFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComputedDataError {
    #[error("computed data has a circular dependency: {}", .0.join(" → "))]
    Cycle(Vec<String>),

    #[error("computed key `{key}` needs `{dependency}`, which is not available yet")]
    MissingDependency { key: String, dependency: String },
}

/// Services computed entries need from the page they belong to.
#[async_trait]
pub trait ComputedHost: Send + Sync {
    /// Render a template string against `data`, without markup conversion.
    async fn render_string(&self, source: &str, data: &Value) -> Result<String>;

    /// Resolve the page's output location from `data`.
    async fn resolve_location(&self, data: &Value) -> Result<OutputLocation>;

    /// Data paths a template string reads.
    fn symbols(&self, source: &str) -> Vec<String>;
}

#[derive(Clone)]
pub enum ComputedKind {
    Function(ComputedFn),
    Template(String),
    Literal(Value),
    PageUrl,
    PageOutputPath,
}

impl fmt::Debug for ComputedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function(..)"),
            Self::Template(source) => f.debug_tuple("Template").field(source).finish(),
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::PageUrl => f.write_str("PageUrl"),
            Self::PageOutputPath => f.write_str("PageOutputPath"),
        }
    }
}

#[derive(Debug, Clone)]
struct ComputedEntry {
    key: String,
    kind: ComputedKind,
    dependencies: Vec<String>,
}

impl ComputedEntry {
    fn reads_collections(&self) -> bool {
        self.dependencies
            .iter()
            .any(|dep| paths_overlap(dep, COLLECTIONS_KEY))
    }
}

/// Computed entries of one page and which of them already ran.
#[derive(Debug, Clone, Default)]
pub struct ComputedData {
    entries: Vec<ComputedEntry>,
    evaluated: FxHashSet<String>,
}

impl ComputedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every leaf of a computed tree under dotted keys.
    ///
    /// Strings become templates with inferred dependencies; other scalars
    /// become literals.
    pub fn add_tree(&mut self, tree: &Value, host: &dyn ComputedHost) {
        self.add_tree_at(String::new(), tree, host);
    }

    fn add_tree_at(&mut self, prefix: String, node: &Value, host: &dyn ComputedHost) {
        let child = |key: &str| {
            if prefix.is_empty() {
                key.to_owned()
            } else {
                format!("{prefix}.{key}")
            }
        };
        match node {
            Value::Object(map) if !map.is_empty() => {
                for (key, value) in map {
                    self.add_tree_at(child(key), value, host);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                for (index, value) in items.iter().enumerate() {
                    self.add_tree_at(child(&index.to_string()), value, host);
                }
            }
            _ if prefix.is_empty() => {}
            Value::String(source) => self.add_template(prefix, source.clone(), None, host),
            other => self.add_literal(prefix, other.clone()),
        }
    }

    /// Register a function with explicit dependencies.
    pub fn add_function<F>(&mut self, key: impl Into<String>, dependencies: Vec<String>, func: F)
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.push(key.into(), ComputedKind::Function(Arc::new(func)), dependencies);
    }

    /// Register a template string. `None` dependencies are inferred.
    pub fn add_template(
        &mut self,
        key: impl Into<String>,
        source: String,
        dependencies: Option<Vec<String>>,
        host: &dyn ComputedHost,
    ) {
        let key = key.into();
        let dependencies = dependencies.unwrap_or_else(|| {
            host.symbols(&source)
                .into_iter()
                .filter(|symbol| *symbol != key)
                .collect()
        });
        self.push(key, ComputedKind::Template(source), dependencies);
    }

    pub fn add_literal(&mut self, key: impl Into<String>, value: Value) {
        self.push(key.into(), ComputedKind::Literal(value), Vec::new());
    }

    /// Register `page.url` and `page.outputPath`, replacing user entries.
    pub fn add_location_entries(&mut self, data: &Value) {
        let computes_permalink = self.entries.iter().any(|e| paths_overlap(&e.key, "permalink"));
        let dependencies: Vec<String> = if computes_permalink || has_path(data, "permalink") {
            vec!["permalink".into()]
        } else {
            Vec::new()
        };
        self.push(PAGE_URL_KEY.into(), ComputedKind::PageUrl, dependencies.clone());
        self.push(PAGE_OUTPUT_PATH_KEY.into(), ComputedKind::PageOutputPath, dependencies);
    }

    fn push(&mut self, key: String, kind: ComputedKind, dependencies: Vec<String>) {
        self.entries.retain(|entry| entry.key != key);
        self.entries.push(ComputedEntry {
            key,
            kind,
            dependencies,
        });
    }

    /// Registered keys, in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// `true` while deferred entries have not run.
    pub fn has_pending(&self) -> bool {
        self.entries.iter().any(|e| !self.evaluated.contains(&e.key))
    }

    /// Phase 1: evaluate everything that does not read collections.
    pub async fn setup_data(&mut self, data: &mut Value, host: &dyn ComputedHost) -> Result<()> {
        let graph = self.graph();
        let order = graph.order()?;
        let deferred = self.collection_dependents(&graph, &order);

        for key in order.iter().filter(|key| !deferred.contains(*key)) {
            self.evaluate(key, data, host).await?;
        }
        Ok(())
    }

    /// Phase 2: evaluate the entries phase 1 deferred.
    pub async fn process_remaining_data(
        &mut self,
        data: &mut Value,
        host: &dyn ComputedHost,
    ) -> Result<()> {
        let order = self.graph().order()?;
        for key in &order {
            if self.evaluated.contains(key) {
                continue;
            }
            if let Some(entry) = self.entry(key)
                && entry.reads_collections()
                && !has_path(data, COLLECTIONS_KEY)
            {
                return Err(ComputedDataError::MissingDependency {
                    key: key.clone(),
                    dependency: COLLECTIONS_KEY.into(),
                }
                .into());
            }
            self.evaluate(key, data, host).await?;
        }
        Ok(())
    }

    fn graph(&self) -> DependencyGraph {
        DependencyGraph::new(
            self.entries
                .iter()
                .map(|e| (e.key.as_str(), e.dependencies.as_slice())),
        )
    }

    fn entry(&self, key: &str) -> Option<&ComputedEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Keys reading collections directly or through other computed keys.
    fn collection_dependents(&self, graph: &DependencyGraph, order: &[String]) -> FxHashSet<String> {
        let mut deferred = FxHashSet::default();
        // `order` lists dependencies first, so one pass suffices.
        for key in order {
            let direct = self.entry(key).is_some_and(ComputedEntry::reads_collections);
            let inherited = graph.dependencies(key).iter().any(|dep| deferred.contains(dep));
            if direct || inherited {
                deferred.insert(key.clone());
            }
        }
        deferred
    }

    async fn evaluate(&mut self, key: &str, data: &mut Value, host: &dyn ComputedHost) -> Result<()> {
        let Some(entry) = self.entry(key) else {
            return Ok(());
        };
        let value = match &entry.kind {
            ComputedKind::Function(func) => func(data)?,
            ComputedKind::Template(source) => Value::String(host.render_string(source, data).await?),
            ComputedKind::Literal(value) => value.clone(),
            ComputedKind::PageUrl => host.resolve_location(data).await?.url_value(),
            ComputedKind::PageOutputPath => host.resolve_location(data).await?.output_path_value(),
        };
        set_path(data, key, value);
        self.evaluated.insert(key.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permalink::{Behavior, PermalinkPath};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replaces `{{ path }}` with the value at `path`.
    #[derive(Default)]
    struct TestHost {
        locations: AtomicUsize,
    }

    #[async_trait]
    impl ComputedHost for TestHost {
        async fn render_string(&self, source: &str, data: &Value) -> Result<String> {
            let mut out = source.to_owned();
            for symbol in self.symbols(source) {
                let value = crate::data::get_path(data, &symbol)
                    .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_owned))
                    .unwrap_or_default();
                out = out.replace(&format!("{{{{ {symbol} }}}}"), &value);
            }
            Ok(out)
        }

        async fn resolve_location(&self, data: &Value) -> Result<OutputLocation> {
            self.locations.fetch_add(1, Ordering::SeqCst);
            let link = data["permalink"].as_str().unwrap_or("/default/");
            Ok(OutputLocation {
                behavior: Behavior::WRITE,
                path: Some(PermalinkPath::new(
                    link,
                    Path::new("_site"),
                    false,
                    &Default::default(),
                    Path::new("a.md"),
                )),
                variants: BTreeMap::new(),
            })
        }

        fn symbols(&self, source: &str) -> Vec<String> {
            source
                .split("{{")
                .skip(1)
                .filter_map(|rest| rest.split_once("}}"))
                .map(|(inner, _)| inner.trim().to_owned())
                .collect()
        }
    }

    #[tokio::test]
    async fn test_tree_registers_dotted_keys() {
        let host = TestHost::default();
        let mut computed = ComputedData::new();
        computed.add_tree(
            &json!({"nav": {"key": "{{ title }}", "order": 3}, "list": ["a", 1]}),
            &host,
        );
        let keys: Vec<_> = computed.keys().collect();
        assert_eq!(keys, ["nav.key", "nav.order", "list.0", "list.1"]);

        let mut data = json!({"title": "Home"});
        computed.setup_data(&mut data, &host).await.unwrap();
        assert_eq!(data["nav"], json!({"key": "Home", "order": 3}));
        assert_eq!(data["list"], json!(["a", 1]));
    }

    #[tokio::test]
    async fn test_chained_entries_see_resolved_values() {
        let host = TestHost::default();
        let mut computed = ComputedData::new();
        computed.add_tree(&json!({"b": "{{ a }}!", "a": "{{ title }}"}), &host);
        let mut data = json!({"title": "x"});
        computed.setup_data(&mut data, &host).await.unwrap();
        assert_eq!(data["a"], json!("x"));
        assert_eq!(data["b"], json!("x!"));
    }

    #[tokio::test]
    async fn test_collection_dependents_deferred() {
        let host = TestHost::default();
        let mut computed = ComputedData::new();
        computed.add_tree(
            &json!({"count": "{{ collections.all.length }}", "label": "n={{ count }}", "plain": "{{ title }}"}),
            &host,
        );
        computed.add_location_entries(&json!({}));

        let mut data = json!({"title": "t"});
        computed.setup_data(&mut data, &host).await.unwrap();
        assert_eq!(data["plain"], json!("t"));
        assert_eq!(data["page"]["url"], json!("/default/"));
        assert!(data.get("count").is_none());
        assert!(data.get("label").is_none());
        assert!(computed.has_pending());

        data["collections"] = json!({"all": {"length": 2}});
        computed.process_remaining_data(&mut data, &host).await.unwrap();
        assert_eq!(data["count"], json!("2"));
        assert_eq!(data["label"], json!("n=2"));
        assert!(!computed.has_pending());
    }

    #[tokio::test]
    async fn test_phase_two_without_collections_errors() {
        let host = TestHost::default();
        let mut computed = ComputedData::new();
        computed.add_tree(&json!({"count": "{{ collections.all }}"}), &host);
        let mut data = json!({});
        computed.setup_data(&mut data, &host).await.unwrap();
        let err = computed
            .process_remaining_data(&mut data, &host)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ComputedDataError>(),
            Some(ComputedDataError::MissingDependency { .. })
        ));
    }

    #[tokio::test]
    async fn test_location_follows_computed_permalink() {
        let host = TestHost::default();
        let mut computed = ComputedData::new();
        computed.add_tree(&json!({"permalink": "/{{ slug }}/"}), &host);
        let mut data = json!({"slug": "hello", "permalink": "/ignored/"});
        computed.add_location_entries(&data);

        computed.setup_data(&mut data, &host).await.unwrap();
        assert_eq!(data["page"]["url"], json!("/hello/"));
        assert_eq!(data["page"]["outputPath"], json!("_site/hello/index.html"));
    }

    #[tokio::test]
    async fn test_function_with_explicit_dependencies() {
        let host = TestHost::default();
        let mut computed = ComputedData::new();
        computed.add_function("upper", vec!["title".into()], |data| {
            Ok(json!(data["title"].as_str().unwrap_or("").to_uppercase()))
        });
        let mut data = json!({"title": "abc"});
        computed.setup_data(&mut data, &host).await.unwrap();
        assert_eq!(data["upper"], json!("ABC"));
    }

    #[tokio::test]
    async fn test_cycle_is_fatal() {
        let host = TestHost::default();
        let mut computed = ComputedData::new();
        computed.add_tree(&json!({"a": "{{ b }}", "b": "{{ a }}"}), &host);
        let err = computed
            .setup_data(&mut json!({}), &host)
            .await
            .unwrap_err();
        let display = err.to_string();
        assert!(display.contains("a → b → a"), "{display}");
    }

    #[tokio::test]
    async fn test_builtin_replaces_user_entry() {
        let host = TestHost::default();
        let mut computed = ComputedData::new();
        computed.add_tree(&json!({"page": {"url": "/user/"}}), &host);
        computed.add_location_entries(&json!({}));
        assert_eq!(computed.keys().filter(|k| *k == PAGE_URL_KEY).count(), 1);
    }
}
