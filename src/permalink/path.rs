//! A resolved permalink and the paths derived from it.

use crate::config::Hooks;
use serde::Serialize;
use std::path::Path;

/// One output target.
///
/// For the link `/posts/a/` under output dir `_site`:
///
/// | field | value |
/// |-------|-------|
/// | `href` | `/posts/a/` |
/// | `path_from_root` | `/posts/a/index.html` |
/// | `path_from_output_dir` | `posts/a/index.html` |
/// | `raw_output_path` | `_site/posts/a/index.html` |
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermalinkPath {
    pub href: String,
    pub path_from_root: String,
    pub path_from_output_dir: String,
    pub raw_output_path: String,
}

impl PermalinkPath {
    /// Build from a link after URL transforms.
    ///
    /// With `root_override` the link is taken relative to the project root
    /// instead of the output directory.
    pub fn new(
        link: &str,
        output_dir: &Path,
        root_override: bool,
        hooks: &Hooks,
        input_path: &Path,
    ) -> Self {
        let link = hooks.apply_url_transforms(link.trim(), input_path);
        let mut relative = link.trim_start_matches('/').to_owned();
        if relative.is_empty() || relative.ends_with('/') {
            relative.push_str("index.html");
        }

        let path_from_root = format!("/{relative}");
        let href = match path_from_root.strip_suffix("index.html") {
            Some(dir) if dir.ends_with('/') => dir.to_owned(),
            _ => path_from_root.clone(),
        };
        let raw_output_path = if root_override {
            relative.clone()
        } else {
            join_slash(output_dir, &relative)
        };

        Self {
            href,
            path_from_root,
            path_from_output_dir: relative,
            raw_output_path,
        }
    }
}

/// Join with `/` regardless of platform; output paths are reported verbatim.
fn join_slash(dir: &Path, relative: &str) -> String {
    let dir = dir.to_string_lossy();
    let dir = dir.trim_end_matches(['/', '\\']);
    if dir.is_empty() || dir == "." {
        relative.to_owned()
    } else {
        format!("{dir}/{relative}")
    }
}
