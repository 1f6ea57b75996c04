//! URL slugification and template path naming.
//!
//! Derives the `page.fileSlug` / `page.filePathStem` values from a template's
//! path relative to the input directory, and provides the `slug` filter.

use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Leading `YYYY-MM-DD-` on dated post file names.
static DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}-").unwrap());

// ============================================================================
// Slugification
// ============================================================================

/// Convert text to a lowercase ASCII slug (e.g., "Héllo World!" → "hello-world").
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

// ============================================================================
// Template Path Naming
// ============================================================================

/// File name without extension and without a leading date prefix.
fn bare_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    DATE_PREFIX.replace(&stem, "").into_owned()
}

/// `page.fileSlug` for a path relative to the input directory.
///
/// | relative | slug |
/// |----------|------|
/// | `posts/a.md` | `a` |
/// | `posts/2021-03-04-hello.md` | `hello` |
/// | `posts/index.md` | `posts` |
/// | `index.md` | `` |
pub fn file_slug(relative: &Path) -> String {
    let stem = bare_stem(relative);
    if stem != "index" {
        return stem;
    }
    match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => bare_stem(parent),
        _ => String::new(),
    }
}

/// `path` relative to `base`, `None` when `path` is not under it.
///
/// Relative paths are taken as already relative to `base`.
pub fn relative_to(path: &Path, base: &Path) -> Option<PathBuf> {
    if path.is_relative() {
        return Some(path.components().filter(|c| !matches!(c, Component::CurDir)).collect());
    }
    path.strip_prefix(base).ok().map(Path::to_path_buf)
}

/// `page.filePathStem`: the relative path without extension, rooted at `/`.
///
/// `posts/a.md` → `/posts/a`, `index.md` → `/index`.
pub fn file_path_stem(relative: &Path) -> String {
    let mut parts: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if let Some(stem) = relative.file_stem() {
        parts.push(stem.to_string_lossy().into_owned());
    }
    format!("/{}", parts.join("/"))
}
