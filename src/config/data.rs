//! `[data]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[data]` section in folio.toml - data cascade behavior.
///
/// # Example
/// ```toml
/// [data]
/// deep_merge = true
/// reserved = ["folio", "page", "content", "collections"]
/// selectors = ["title", "page.date"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Merge nested objects key-wise instead of replacing them.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub deep_merge: bool,

    /// Top-level keys user data may not set.
    #[serde(default = "defaults::data::reserved")]
    #[educe(Default = defaults::data::reserved())]
    pub reserved: Vec<String>,

    /// Key holding the computed-data tree.
    #[serde(default = "defaults::data::computed_key")]
    #[educe(Default = defaults::data::computed_key())]
    pub computed_key: String,

    /// Key naming a page's layout.
    #[serde(default = "defaults::data::layout_key")]
    #[educe(Default = defaults::data::layout_key())]
    pub layout_key: String,

    /// Dotted path receiving the front matter excerpt. Empty disables it.
    #[serde(default = "defaults::data::excerpt_key")]
    #[educe(Default = defaults::data::excerpt_key())]
    pub excerpt_key: String,

    /// Dotted paths copied into write reports.
    #[serde(default)]
    pub selectors: Vec<String>,
}
