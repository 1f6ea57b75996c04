//! Built-in interpolation engine.
//!
//! Supports YAML front matter, `{{ dotted.path | filter }}` interpolation and,
//! for Markdown inputs, conversion to HTML.
//!
//! | Filter | Effect |
//! |--------|--------|
//! | `slug` | lowercase ASCII slug |
//! | `url` | rooted URL path with duplicate slashes collapsed |
//! | `json` | JSON encoding of the value |
//! | `upper` / `lower` | case conversion |

use super::{Content, Engine, FrontMatter};
use crate::data::get_path;
use crate::permalink::Permalink;
use crate::utils::slug::slugify;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use gray_matter::Matter;
use gray_matter::engine::YAML;
use pulldown_cmark::{Parser, html as md_html};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Ends the excerpt at the top of a body. A bare `---` is a horizontal rule.
pub const EXCERPT_SEPARATOR: &str = "<!-- excerpt -->";

/// `{{ expression }}`
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{([^}]*)\}\}").unwrap());

/// Markup handled by a [`SimpleEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Markdown,
    Html,
}

#[derive(Debug, Clone)]
pub struct SimpleEngine {
    syntax: Syntax,
    permalink_hook: Option<Permalink>,
}

impl SimpleEngine {
    pub fn new(syntax: Syntax) -> Self {
        Self {
            syntax,
            permalink_hook: None,
        }
    }

    /// Supply `permalink` to pages that declare none.
    pub fn with_permalink_hook(mut self, permalink: Permalink) -> Self {
        self.permalink_hook = Some(permalink);
        self
    }

    fn interpolate(&self, source: &str, data: &Value) -> Result<String> {
        let mut failure = None;
        let output = EXPRESSION.replace_all(source, |caps: &Captures| {
            match evaluate(&caps[1], data) {
                Ok(text) => text,
                Err(err) => {
                    failure.get_or_insert(err);
                    String::new()
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(output.into_owned()),
        }
    }
}

#[async_trait]
impl Engine for SimpleEngine {
    fn name(&self) -> &str {
        match self.syntax {
            Syntax::Markdown => "md",
            Syntax::Html => "html",
        }
    }

    fn file_extensions(&self) -> &[&'static str] {
        match self.syntax {
            Syntax::Markdown => &["md", "markdown"],
            Syntax::Html => &["html", "htm"],
        }
    }

    fn parse_front_matter(&self, raw: &str) -> Result<FrontMatter> {
        if !raw.trim_start().starts_with("---") {
            return Ok(FrontMatter {
                data: Value::Object(Map::new()),
                excerpt: None,
                body: raw.to_owned(),
            });
        }

        let mut matter = Matter::<YAML>::new();
        matter.excerpt_delimiter = Some(EXCERPT_SEPARATOR.to_owned());
        let parsed = matter.parse(raw);
        let data = match parsed.data {
            Some(pod) => pod
                .deserialize::<Value>()
                .context("failed to deserialize front matter")?,
            None => Value::Null,
        };
        let data = match data {
            Value::Object(map) => Value::Object(map),
            Value::Null => Value::Object(Map::new()),
            other => bail!("front matter must be a mapping, found `{other}`"),
        };

        Ok(FrontMatter {
            data,
            excerpt: parsed.excerpt.map(|e| e.trim().to_owned()).filter(|e| !e.is_empty()),
            body: parsed.content,
        })
    }

    async fn render(&self, source: &str, data: &Value, bypass_markdown: bool) -> Result<Content> {
        let text = self.interpolate(source, data)?;
        if self.syntax == Syntax::Html || bypass_markdown {
            return Ok(Content::Text(text));
        }

        let mut html = String::with_capacity(text.len() * 3 / 2);
        md_html::push_html(&mut html, Parser::new(&text));
        Ok(Content::Text(html))
    }

    fn permalink_hook(&self) -> Option<Permalink> {
        self.permalink_hook.clone()
    }

    fn symbols(&self, source: &str) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for caps in EXPRESSION.captures_iter(source) {
            let path = caps[1].split('|').next().unwrap_or_default().trim();
            if !path.is_empty() && !symbols.iter().any(|s| s == path) {
                symbols.push(path.to_owned());
            }
        }
        symbols
    }
}

/// Evaluate `path | filter | filter`.
fn evaluate(expression: &str, data: &Value) -> Result<String> {
    let mut parts = expression.split('|').map(str::trim);
    let path = parts.next().unwrap_or_default();
    let mut value = get_path(data, path).cloned().unwrap_or(Value::Null);

    for filter in parts {
        value = match filter {
            "slug" => Value::String(slugify(&stringify(&value))),
            "url" => Value::String(to_url(&stringify(&value))),
            "json" => Value::String(serde_json::to_string(&value)?),
            "upper" => Value::String(stringify(&value).to_uppercase()),
            "lower" => Value::String(stringify(&value).to_lowercase()),
            other => bail!("unknown filter `{other}` in `{{{{{expression}}}}}`"),
        };
    }
    Ok(stringify(&value))
}

/// Interpolated form of a value. Missing values render empty.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_url(path: &str) -> String {
    let mut url = String::with_capacity(path.len() + 1);
    for c in std::iter::once('/').chain(path.chars()) {
        if c == '/' && url.ends_with('/') {
            continue;
        }
        url.push(c);
    }
    url
}
