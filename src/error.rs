//! Error kinds surfaced by the page pipeline.
//!
//! The pipeline propagates `anyhow::Error`; each kind below is a distinct
//! type so callers can tell failures apart with `downcast_ref`.
//!
//! | Kind | Raised by |
//! |------|-----------|
//! | [`DataCascadeError`] | cascade merge (wraps [`ReservedDataViolation`]) |
//! | [`InvalidDateFrontMatter`] | page date resolution |
//! | [`TransformFailure`] | transform chain |
//! | [`ContentAccessError`] | `PageEntry::template_content` |
//! | [`InvalidRenderOutput`] | write step |

use std::path::PathBuf;
use thiserror::Error;

/// User data set one or more keys the generator owns.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("reserved data keys set by user data: {}", keys.join(", "))]
pub struct ReservedDataViolation {
    /// Every offending key, sorted and deduplicated.
    pub keys: Vec<String>,
}

/// Cascade merge failures that carry a remediation hint.
#[derive(Debug, Error)]
pub enum DataCascadeError {
    #[error(
        "`{input}` sets data the generator reserves ({}). Rename these keys in your \
         front matter or data files, or remove them from `[data] reserved` in the config",
        violation.keys.join(", ")
    )]
    Reserved {
        input: PathBuf,
        #[source]
        violation: ReservedDataViolation,
    },
}

impl DataCascadeError {
    /// The reserved keys behind the failure.
    pub fn reserved_keys(&self) -> &[String] {
        match self {
            Self::Reserved { violation, .. } => &violation.keys,
        }
    }
}

/// Front matter `date` could not be parsed as ISO-8601.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("`{input}` has an invalid `date` in its data: `{value}` is not an ISO-8601 date")]
pub struct InvalidDateFrontMatter {
    pub input: PathBuf,
    pub value: String,
}

/// A registered transform failed; remaining transforms were not run.
#[derive(Debug, Error)]
#[error("transform `{name}` failed for `{input}` (output `{output}`)")]
pub struct TransformFailure {
    pub name: String,
    pub input: PathBuf,
    pub output: String,
    #[source]
    pub source: anyhow::Error,
}

/// Reading a page entry's content before it exists.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentAccessError {
    /// The template renders, but not yet: a caller ordering bug.
    #[error(
        "content of `{input}` was read before it was rendered; \
         render the page entry before reading its content"
    )]
    NotYetRendered { input: PathBuf },

    /// The template's permalink disables rendering, so content never exists.
    #[error("`{input}` is not rendered (its permalink disables rendering), so it has no content")]
    Unrenderable { input: PathBuf },
}

/// A render step produced something that is neither text nor bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("engine `{engine}` rendered {found} for `{input}`; only text or binary content can be written")]
pub struct InvalidRenderOutput {
    pub engine: String,
    pub input: PathBuf,
    pub found: &'static str,
}
