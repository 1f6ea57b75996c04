//! `[build]` section configuration.
//!
//! Input/output locations and how finished pages leave the pipeline.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where written pages go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Write files under the output directory (default).
    #[default]
    Fs,
    /// Collect every write result into one JSON array.
    Json,
    /// Stream one JSON object per line as pages finish.
    Ndjson,
}

impl OutputMode {
    /// Reporting modes never touch the filesystem.
    #[inline]
    pub const fn writes_files(self) -> bool {
        matches!(self, Self::Fs)
    }
}

/// `[build]` section in folio.toml.
///
/// # Example
/// ```toml
/// [build]
/// input = "src"            # Template root
/// output = "_site"         # Output root
/// includes = "_includes"   # Layouts, relative to input
/// data = "_data"           # Global data, relative to input
/// output_mode = "fs"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Template root; page subfolders are relative to it.
    #[serde(default = "defaults::build::input")]
    #[educe(Default = defaults::build::input())]
    pub input: PathBuf,

    /// Output root, as it appears in `page.outputPath`.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Layout directory, relative to `input`.
    #[serde(default = "defaults::build::includes")]
    #[educe(Default = defaults::build::includes())]
    pub includes: PathBuf,

    /// Global data directory, relative to `input`.
    #[serde(default = "defaults::build::data")]
    #[educe(Default = defaults::build::data())]
    pub data: PathBuf,

    /// Run the whole pipeline without writing anything.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub dry_run: bool,

    #[serde(default)]
    pub output_mode: OutputMode,

    /// Appended to the page stem when an HTML input would overwrite itself.
    #[serde(default = "defaults::build::html_output_suffix")]
    #[educe(Default = defaults::build::html_output_suffix())]
    pub html_output_suffix: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults() {
        let build = BuildConfig::default();
        assert_eq!(build.input, PathBuf::from("src"));
        assert_eq!(build.output, PathBuf::from("_site"));
        assert_eq!(build.includes, PathBuf::from("_includes"));
        assert_eq!(build.data, PathBuf::from("_data"));
        assert_eq!(build.html_output_suffix, "-o");
        assert_eq!(build.output_mode, OutputMode::Fs);
        assert!(!build.dry_run);
    }

    #[test]
    fn test_output_mode_lowercase() {
        let build: BuildConfig = toml::from_str(r#"output_mode = "ndjson""#).unwrap();
        assert_eq!(build.output_mode, OutputMode::Ndjson);
        assert!(!build.output_mode.writes_files());
        assert!(OutputMode::Fs.writes_files());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<BuildConfig, _> = toml::from_str(r#"minify = true"#);
        assert!(result.is_err());
    }
}
