//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn input() -> PathBuf {
        "src".into()
    }

    pub fn output() -> PathBuf {
        "_site".into()
    }

    pub fn includes() -> PathBuf {
        "_includes".into()
    }

    pub fn data() -> PathBuf {
        "_data".into()
    }

    pub fn html_output_suffix() -> String {
        "-o".into()
    }
}

// ============================================================================
// [data] Section Defaults
// ============================================================================

pub mod data {
    pub fn reserved() -> Vec<String> {
        ["folio", "page", "content", "collections"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn computed_key() -> String {
        "computed".into()
    }

    pub fn layout_key() -> String {
        "layout".into()
    }

    pub fn excerpt_key() -> String {
        "page.excerpt".into()
    }
}
