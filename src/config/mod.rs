//! Site configuration management for `folio.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                         |
//! |---------------|-------------------------------------------------|
//! | `[build]`     | Input/output paths, dry run, output mode        |
//! | `[data]`      | Merge mode, reserved keys, special data keys    |
//! | `[permalink]` | Dynamic permalink rendering switches            |
//!
//! Closures (transforms, linters, URL transforms) cannot live in TOML and are
//! registered through [`Hooks`].
//!
//! # Example
//!
//! ```toml
//! [build]
//! input = "src"
//! output = "_site"
//!
//! [data]
//! deep_merge = true
//! selectors = ["title"]
//!
//! [permalink]
//! dynamic = true
//! ```

mod build;
mod data;
pub mod defaults;
mod error;
mod hooks;
mod permalink;

pub use build::{BuildConfig, OutputMode};
pub use data::DataConfig;
pub use error::ConfigError;
pub use hooks::{HookContext, Hooks, Linter, Transform, UrlTransformContext};
pub use permalink::PermalinkConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing folio.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Data cascade settings
    #[serde(default)]
    pub data: DataConfig,

    /// Permalink settings
    #[serde(default)]
    pub permalink: PermalinkConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Template root on disk.
    pub fn input_dir(&self) -> PathBuf {
        self.get_root().join(&self.build.input)
    }

    /// Output root on disk.
    pub fn output_dir(&self) -> PathBuf {
        self.get_root().join(&self.build.output)
    }

    /// Layout directory on disk.
    pub fn includes_dir(&self) -> PathBuf {
        self.input_dir().join(&self.build.includes)
    }

    /// Resolve a `page.outputPath` value to a location on disk.
    pub fn resolve_output(&self, output_path: &str) -> PathBuf {
        let path = Path::new(output_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.get_root().join(path)
        }
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());
        let root = Self::normalize_path(&root);
        self.set_root(&root);
        self.config_path = Self::normalize_path(&root.join(&cli.config));

        match &cli.command {
            Commands::Build { build_args } => {
                Self::update_option(&mut self.build.output, build_args.output.as_ref());
                Self::update_option(&mut self.build.output_mode, build_args.to.as_ref());
                if build_args.dry_run {
                    self.build.dry_run = true;
                }
            }
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before building
    pub fn validate(&self) -> Result<()> {
        if self.build.output.as_os_str().is_empty() {
            bail!(ConfigError::Validation(
                "[build.output] must not be empty".into()
            ));
        }

        if self.data.reserved.iter().any(|key| key.trim().is_empty()) {
            bail!(ConfigError::Validation(
                "[data.reserved] must not contain empty keys".into()
            ));
        }

        if self.data.computed_key.is_empty() || self.data.layout_key.is_empty() {
            bail!(ConfigError::Validation(
                "[data.computed_key] and [data.layout_key] must not be empty".into()
            ));
        }

        if self.build.input == self.build.output && self.build.html_output_suffix.is_empty() {
            bail!(ConfigError::Validation(
                "[build.input] equals [build.output]; set [build.html_output_suffix] so html \
                 inputs are not overwritten"
                    .into()
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::BuildArgs;

    #[test]
    fn test_from_str() {
        let config = SiteConfig::from_str(
            r#"
            [build]
            input = "content"
            output = "dist"

            [data]
            selectors = ["title", "page.url"]
        "#,
        )
        .unwrap();

        assert_eq!(config.build.input, PathBuf::from("content"));
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert_eq!(config.data.selectors, ["title", "page.url"]);
        assert!(config.permalink.dynamic);
    }

    #[test]
    fn test_from_str_invalid_toml() {
        let result = SiteConfig::from_str("[build\ninput = 1");
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_unknown_top_level_field_rejection() {
        let result = SiteConfig::from_str(
            r#"
            [serve]
            port = 1
        "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_get_root_default() {
        let config = SiteConfig::default();
        assert_eq!(config.get_root(), Path::new("./"));
    }

    #[test]
    fn test_dirs_join_root() {
        let mut config = SiteConfig::default();
        config.set_root(Path::new("/site"));
        assert_eq!(config.input_dir(), PathBuf::from("/site/src"));
        assert_eq!(config.output_dir(), PathBuf::from("/site/_site"));
        assert_eq!(config.includes_dir(), PathBuf::from("/site/src/_includes"));
        assert_eq!(
            config.resolve_output("_site/a/index.html"),
            PathBuf::from("/site/_site/a/index.html")
        );
        assert_eq!(config.resolve_output("/abs/x.html"), PathBuf::from("/abs/x.html"));
    }

    #[test]
    fn test_update_with_cli() {
        let cli = Cli {
            root: Some(PathBuf::from("/nonexistent/site")),
            config: PathBuf::from("folio.toml"),
            command: Commands::Build {
                build_args: BuildArgs {
                    dry_run: true,
                    to: Some(OutputMode::Ndjson),
                    output: Some(PathBuf::from("out")),
                    files: vec![PathBuf::from("a.md")],
                },
            },
        };
        let mut config = SiteConfig::default();
        config.update_with_cli(&cli);

        assert_eq!(config.get_root(), Path::new("/nonexistent/site"));
        assert_eq!(config.config_path, PathBuf::from("/nonexistent/site/folio.toml"));
        assert_eq!(config.build.output, PathBuf::from("out"));
        assert_eq!(config.build.output_mode, OutputMode::Ndjson);
        assert!(config.build.dry_run);
    }

    #[test]
    fn test_validate_defaults_pass() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_reserved_key() {
        let mut config = SiteConfig::default();
        config.data.reserved.push(" ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_same_dirs_without_suffix() {
        let mut config = SiteConfig::default();
        config.build.output = config.build.input.clone();
        assert!(config.validate().is_ok());
        config.build.html_output_suffix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_output() {
        let mut config = SiteConfig::default();
        config.build.output = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
