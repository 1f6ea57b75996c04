//! Permalink resolution for one page.

use super::{BUILD_KEY, Behavior, Permalink, PermalinkPath};
use crate::config::{Hooks, SiteConfig};
use crate::data::get_path;
use crate::engine::Engine;
use anyhow::{Result, bail};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Component, Path};

/// Result of resolving a page's permalink.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLocation {
    pub behavior: Behavior,
    /// The written target; `None` when the page is not written.
    pub path: Option<PermalinkPath>,
    /// Rendered values of a permalink object, keyed by variant.
    pub variants: BTreeMap<String, Value>,
}

impl OutputLocation {
    fn written(path: PermalinkPath) -> Self {
        Self {
            behavior: Behavior::WRITE,
            path: Some(path),
            variants: BTreeMap::new(),
        }
    }

    /// `page.url`: the href, or `false` when not written.
    pub fn url_value(&self) -> Value {
        self.path
            .as_ref()
            .map_or(Value::Bool(false), |p| Value::String(p.href.clone()))
    }

    /// `page.outputPath`: the raw output path, or `false` when not written.
    pub fn output_path_value(&self) -> Value {
        self.path
            .as_ref()
            .map_or(Value::Bool(false), |p| Value::String(p.raw_output_path.clone()))
    }
}

/// Everything permalink resolution needs to know about one page.
pub struct PermalinkResolver<'a> {
    pub engine: &'a dyn Engine,
    pub config: &'a SiteConfig,
    pub hooks: &'a Hooks,
    /// Input path as reported in `page.inputPath`.
    pub input_path: &'a Path,
    /// Input path relative to the input directory.
    pub relative: &'a Path,
    /// Extra directory level for paginated pages (`2` for page 3).
    pub extra_output_subdir: Option<&'a str>,
}

impl PermalinkResolver<'_> {
    /// Resolve `data.permalink` to an output location.
    ///
    /// Order: `false`, then the raw value when dynamic rendering is off, then
    /// rendered object variants or string, then the engine hook, then the
    /// default path.
    pub async fn resolve(&self, data: &Value) -> Result<OutputLocation> {
        let dynamic = self.config.permalink.dynamic
            && get_path(data, "dynamicPermalink") != Some(&Value::Bool(false));
        let root_override = get_path(data, "permalinkRoot") == Some(&Value::Bool(true));

        let declared = match get_path(data, "permalink") {
            Some(value) => Permalink::from_value(value, self.input_path)?,
            None => None,
        };
        let (permalink, render) = match declared {
            Some(permalink) => (Some(permalink), dynamic),
            None if self.config.permalink.dynamic_default => (self.engine.permalink_hook(), dynamic),
            None => (None, false),
        };

        // A function's result is final; it is interpreted but not rendered.
        let (permalink, render) = match permalink {
            Some(Permalink::Computed(func)) => {
                (Permalink::from_value(&func(data)?, self.input_path)?, false)
            }
            other => (other, render),
        };

        let location = match permalink {
            None => OutputLocation::written(self.path(&self.default_link(), root_override)),
            Some(Permalink::Disabled) => OutputLocation {
                behavior: Behavior::RENDER_ONLY,
                path: None,
                variants: BTreeMap::new(),
            },
            Some(Permalink::Literal(link)) => {
                let link = if render {
                    self.engine.render_permalink(&link, data).await?
                } else {
                    link
                };
                OutputLocation::written(self.path(&link, root_override))
            }
            Some(Permalink::Variants(variants)) => {
                let variants = if render {
                    self.render_variants(variants, data).await?
                } else {
                    variants
                };
                self.variant_location(variants, root_override)?
            }
            Some(Permalink::Computed(_)) => {
                bail!(
                    "permalink function for `{}` returned another function",
                    self.input_path.display()
                )
            }
        };
        Ok(location)
    }

    /// Render every variant concurrently. `build` passes through.
    async fn render_variants(
        &self,
        variants: BTreeMap<String, Value>,
        data: &Value,
    ) -> Result<BTreeMap<String, Value>> {
        let rendered = try_join_all(variants.into_iter().map(|(key, value)| async move {
            if key == BUILD_KEY {
                return Ok((key, value));
            }
            let value = match value {
                Value::String(link) => Value::String(self.engine.render_permalink(&link, data).await?),
                Value::Array(items) => {
                    let items = try_join_all(items.into_iter().map(|item| async move {
                        match item {
                            Value::String(link) => self
                                .engine
                                .render_permalink(&link, data)
                                .await
                                .map(Value::String),
                            other => Ok(other),
                        }
                    }))
                    .await?;
                    Value::Array(items)
                }
                other => other,
            };
            anyhow::Ok((key, value))
        }))
        .await?;
        Ok(rendered.into_iter().collect())
    }

    fn variant_location(
        &self,
        variants: BTreeMap<String, Value>,
        root_override: bool,
    ) -> Result<OutputLocation> {
        let link = match variants.get(BUILD_KEY) {
            None => {
                return Ok(OutputLocation {
                    behavior: Behavior::SKIP,
                    path: None,
                    variants,
                });
            }
            Some(Value::Bool(false)) => None,
            Some(Value::String(link)) => Some(link.clone()),
            Some(Value::Array(items)) => items.iter().find_map(Value::as_str).map(str::to_owned),
            Some(other) => bail!(
                "`{}` has an unsupported `permalink.build` value `{other}`",
                self.input_path.display()
            ),
        };

        Ok(match link {
            Some(link) => OutputLocation {
                behavior: Behavior::WRITE,
                path: Some(self.path(&link, root_override)),
                variants,
            },
            None => OutputLocation {
                behavior: Behavior::RENDER_ONLY,
                path: None,
                variants,
            },
        })
    }

    fn path(&self, link: &str, root_override: bool) -> PermalinkPath {
        PermalinkPath::new(
            link,
            &self.config.build.output,
            root_override,
            self.hooks,
            self.input_path,
        )
    }

    /// Link derived from the input path.
    ///
    /// `posts/a.md` → `/posts/a/index.html`, `posts/index.md` →
    /// `/posts/index.html`; non-HTML output keeps the stem as file name.
    fn default_link(&self) -> String {
        let mut parts: Vec<String> = self
            .relative
            .parent()
            .into_iter()
            .flat_map(Path::components)
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let stem = self
            .relative
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self.engine.default_output_extension();

        if ext != "html" {
            parts.extend(self.extra_output_subdir.map(str::to_owned));
            parts.push(format!("{stem}.{ext}"));
            return format!("/{}", parts.join("/"));
        }

        if stem != "index" {
            parts.push(stem);
        }
        parts.extend(self.extra_output_subdir.map(str::to_owned));

        let output = self.config.output_dir().join(parts.join("/")).join("index.html");
        let input = self.config.input_dir().join(self.relative);
        let file = if output == input {
            format!("index{}.html", self.config.build.html_output_suffix)
        } else {
            "index.html".to_owned()
        };
        parts.push(file);
        format!("/{}", parts.join("/"))
    }
}
