//! Site-wide collections, built once every page entry exists.
//!
//! ```text
//! collections.all        every collected entry, by date then input path
//! collections.<tag>      entries whose `tags` contain <tag>
//! ```
//!
//! Entries with `excludeFromCollections: true` are left out.

use crate::data::get_path;
use crate::template::PageEntry;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const ALL_KEY: &str = "all";

/// One entry as seen from another page's `collections`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    pub url: Value,
    pub output_path: Value,
    pub input_path: String,
    pub file_slug: Value,
    pub date: Value,
    pub data: Value,
}

impl CollectionItem {
    fn from_entry(entry: &PageEntry) -> Self {
        let page = |key: &str| get_path(&entry.data, key).cloned().unwrap_or(Value::Null);
        Self {
            url: page("page.url"),
            output_path: page("page.outputPath"),
            input_path: entry.input_path().to_owned(),
            file_slug: page("page.fileSlug"),
            date: page("page.date"),
            data: entry.data.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Collections {
    all: Vec<CollectionItem>,
    by_tag: BTreeMap<String, Vec<CollectionItem>>,
}

impl Collections {
    pub fn build(entries: &[PageEntry]) -> Self {
        let mut all: Vec<CollectionItem> = entries
            .iter()
            .filter(|entry| !excluded(entry))
            .map(CollectionItem::from_entry)
            .collect();
        // `page.date` is RFC 3339 in UTC, so string order is time order.
        all.sort_by(|a, b| {
            let date = |item: &CollectionItem| item.date.as_str().unwrap_or_default().to_owned();
            date(a).cmp(&date(b)).then_with(|| a.input_path.cmp(&b.input_path))
        });

        let mut by_tag: BTreeMap<String, Vec<CollectionItem>> = BTreeMap::new();
        for item in &all {
            for tag in tags(&item.data) {
                let items = by_tag.entry(tag.to_owned()).or_default();
                if !items.iter().any(|i| i.input_path == item.input_path && i.url == item.url) {
                    items.push(item.clone());
                }
            }
        }
        Self { all, by_tag }
    }

    pub fn all(&self) -> &[CollectionItem] {
        &self.all
    }

    pub fn tag(&self, tag: &str) -> &[CollectionItem] {
        self.by_tag.get(tag).map_or(&[], Vec::as_slice)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(String::as_str)
    }

    /// The `collections` object handed to every page.
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        for (tag, items) in &self.by_tag {
            map.insert(tag.clone(), serde_json::to_value(items).unwrap_or_default());
        }
        map.insert(
            ALL_KEY.to_owned(),
            serde_json::to_value(&self.all).unwrap_or_default(),
        );
        Value::Object(map)
    }
}

fn excluded(entry: &PageEntry) -> bool {
    entry.data.get("excludeFromCollections") == Some(&Value::Bool(true))
}

/// `tags: "a"` or `tags: ["a", "b"]`; the reserved `all` tag is ignored.
fn tags(data: &Value) -> Vec<&str> {
    let tags: Vec<&str> = match data.get("tags") {
        Some(Value::String(tag)) => vec![tag.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    tags.into_iter().filter(|tag| !tag.is_empty() && *tag != ALL_KEY).collect()
}
