//! Reserved top-level data keys.
//!
//! The generator owns a few top-level names (`page`, `content`, its own
//! namespace, ...). User data sources may not set them.

use super::merge::OVERRIDE_PREFIX;
use crate::error::ReservedDataViolation;
use serde_json::Value;
use std::collections::BTreeSet;

/// Check every source; the error lists each offending key once, sorted.
///
/// `override:page` merges into `page`, so it is checked as `page`.
pub fn check_reserved<'a>(
    sources: impl IntoIterator<Item = &'a Value>,
    reserved: &[String],
) -> Result<(), ReservedDataViolation> {
    let mut offending = BTreeSet::new();
    for source in sources {
        let Value::Object(map) = source else {
            continue;
        };
        for key in map.keys() {
            let name = key.strip_prefix(OVERRIDE_PREFIX).unwrap_or(key);
            if reserved.iter().any(|r| r == name) {
                offending.insert(name.to_owned());
            }
        }
    }

    if offending.is_empty() {
        Ok(())
    } else {
        Err(ReservedDataViolation {
            keys: offending.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reserved() -> Vec<String> {
        vec!["folio".into(), "page".into(), "content".into()]
    }

    #[test]
    fn test_clean_sources_pass() {
        let a = json!({"title": "Hi"});
        let b = json!({"layout": "base"});
        assert!(check_reserved([&a, &b], &reserved()).is_ok());
    }

    #[test]
    fn test_lists_every_key_once() {
        let a = json!({"page": 1, "title": "x"});
        let b = json!({"folio": {}, "page": 2});
        let err = check_reserved([&a, &b], &reserved()).unwrap_err();
        assert_eq!(err.keys, vec!["folio".to_string(), "page".to_string()]);
    }

    #[test]
    fn test_override_prefix_does_not_bypass() {
        let a = json!({"override:page": {"url": "/elsewhere/"}, "override:title": "x"});
        let b = json!({"override:folio": 1});
        let err = check_reserved([&a, &b], &reserved()).unwrap_err();
        assert_eq!(err.keys, vec!["folio".to_string(), "page".to_string()]);
    }

    #[test]
    fn test_nested_keys_are_allowed() {
        let a = json!({"meta": {"page": 1}});
        assert!(check_reserved([&a], &reserved()).is_ok());
    }
}
