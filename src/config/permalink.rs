//! `[permalink]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[permalink]` section in folio.toml.
///
/// # Example
/// ```toml
/// [permalink]
/// dynamic = true          # render `{{ ... }}` in permalinks
/// dynamic_default = true  # let engines supply a permalink
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct PermalinkConfig {
    /// Render permalink strings through the page's engine.
    ///
    /// A page can opt out with `dynamicPermalink: false`.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub dynamic: bool,

    /// Ask the engine for a permalink when the page declares none.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub dynamic_default: bool,
}
