//! Permalinks: where a page is written and how it is linked.
//!
//! ```text
//! data.permalink ──► Permalink::from_value()
//!                        │
//!      ┌─────────────────┼──────────────────┬───────────────────┐
//!      ▼                 ▼                  ▼                   ▼
//!   Disabled          Literal            Variants            Computed
//!  (render only)   (rendered path)   (per-variant paths)   (function)
//!                        │
//!                        ▼
//!        PermalinkResolver::resolve() ──► OutputLocation
//!                                          ├─ behavior { render, write }
//!                                          └─ PermalinkPath { href, raw_output_path, .. }
//! ```
//!
//! Without a declared permalink the engine's hook may supply one; failing
//! that a default path is derived from the input path.

mod path;
mod resolver;

pub use path::PermalinkPath;
pub use resolver::{OutputLocation, PermalinkResolver};

use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Variant key whose path is written.
pub const BUILD_KEY: &str = "build";

pub type PermalinkFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// A declared permalink.
#[derive(Clone)]
pub enum Permalink {
    /// `permalink: false`
    Disabled,
    /// A path template.
    Literal(String),
    /// Named output variants; only [`BUILD_KEY`] is written.
    Variants(BTreeMap<String, Value>),
    /// Computes the permalink value from page data.
    Computed(PermalinkFn),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PermalinkError {
    #[error("`{input}` sets `permalink: true`; use a path string, an object, or `false`")]
    TrueNotAllowed { input: PathBuf },

    #[error("`{input}` has a permalink of unsupported type ({found}); expected a string, object or `false`")]
    InvalidShape { input: PathBuf, found: &'static str },
}

impl Permalink {
    /// Interpret a data value. Empty strings, empty objects and null mean
    /// "no permalink".
    pub fn from_value(value: &Value, input: impl Into<PathBuf>) -> Result<Option<Self>, PermalinkError> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(false) => Ok(Some(Self::Disabled)),
            Value::Bool(true) => Err(PermalinkError::TrueNotAllowed {
                input: input.into(),
            }),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => Ok(Some(Self::Literal(s.clone()))),
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Object(map) => Ok(Some(Self::Variants(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ))),
            Value::Number(_) => Err(PermalinkError::InvalidShape {
                input: input.into(),
                found: "number",
            }),
            Value::Array(_) => Err(PermalinkError::InvalidShape {
                input: input.into(),
                found: "array",
            }),
        }
    }
}

impl fmt::Debug for Permalink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("Disabled"),
            Self::Literal(s) => f.debug_tuple("Literal").field(s).finish(),
            Self::Variants(map) => f.debug_tuple("Variants").field(map).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// What the pipeline does with a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behavior {
    pub render: bool,
    pub write: bool,
}

impl Behavior {
    pub const WRITE: Self = Self {
        render: true,
        write: true,
    };
    pub const RENDER_ONLY: Self = Self {
        render: true,
        write: false,
    };
    pub const SKIP: Self = Self {
        render: false,
        write: false,
    };

    /// Behavior implied by a raw `permalink` value.
    ///
    /// | permalink | render | write |
    /// |-----------|--------|-------|
    /// | `false` | yes | no |
    /// | object without `build` | no | no |
    /// | object with `build: false` | yes | no |
    /// | anything else | yes | yes |
    pub fn from_permalink(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(false)) => Self::RENDER_ONLY,
            Some(Value::Object(map)) if !map.is_empty() => match map.get(BUILD_KEY) {
                None => Self::SKIP,
                Some(Value::Bool(false)) => Self::RENDER_ONLY,
                Some(_) => Self::WRITE,
            },
            _ => Self::WRITE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_shapes() {
        let input = "a.md";
        assert!(matches!(
            Permalink::from_value(&json!(false), input),
            Ok(Some(Permalink::Disabled))
        ));
        assert!(matches!(
            Permalink::from_value(&json!("/a/"), input),
            Ok(Some(Permalink::Literal(s))) if s == "/a/"
        ));
        assert!(matches!(
            Permalink::from_value(&json!({"build": "/a/"}), input),
            Ok(Some(Permalink::Variants(_)))
        ));
        assert!(matches!(Permalink::from_value(&json!({}), input), Ok(None)));
        assert!(matches!(Permalink::from_value(&json!(""), input), Ok(None)));
        assert!(matches!(Permalink::from_value(&Value::Null, input), Ok(None)));
    }

    #[test]
    fn test_true_rejected() {
        let err = Permalink::from_value(&json!(true), "a.md").unwrap_err();
        assert_eq!(
            err,
            PermalinkError::TrueNotAllowed {
                input: PathBuf::from("a.md")
            }
        );
    }

    #[test]
    fn test_invalid_shape() {
        let err = Permalink::from_value(&json!(3), "a.md").unwrap_err();
        assert!(err.to_string().contains("number"));
    }

    #[test]
    fn test_behavior_from_permalink() {
        assert_eq!(Behavior::from_permalink(None), Behavior::WRITE);
        assert_eq!(Behavior::from_permalink(Some(&json!(false))), Behavior::RENDER_ONLY);
        assert_eq!(Behavior::from_permalink(Some(&json!("/a/"))), Behavior::WRITE);
        assert_eq!(
            Behavior::from_permalink(Some(&json!({"feed": "/feed.xml"}))),
            Behavior::SKIP
        );
        assert_eq!(
            Behavior::from_permalink(Some(&json!({"build": false}))),
            Behavior::RENDER_ONLY
        );
        assert_eq!(
            Behavior::from_permalink(Some(&json!({"build": "/a/"}))),
            Behavior::WRITE
        );
        assert_eq!(Behavior::from_permalink(Some(&json!({}))), Behavior::WRITE);
    }
}
