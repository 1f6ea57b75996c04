//! Folio - compile templates into pages.

use anyhow::{Result, bail};
use clap::Parser;
use folio::build::build_pages;
use folio::cli::{Cli, Commands};
use folio::config::{OutputMode, SiteConfig};
use folio::{SiteContext, log};
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Build { build_args } => {
            let mode = config.build.output_mode;
            let ctx = SiteContext::new(config).into_shared();

            let mut stdout = tokio::io::stdout();
            let sink: Option<&mut (dyn AsyncWrite + Unpin + Send)> = match mode {
                OutputMode::Ndjson => Some(&mut stdout),
                OutputMode::Fs | OutputMode::Json => None,
            };
            let report = build_pages(&ctx, &build_args.files, sink).await?;

            if mode == OutputMode::Json {
                let mut json = serde_json::to_vec_pretty(&report.results)?;
                json.push(b'\n');
                stdout.write_all(&json).await?;
            }
            stdout.flush().await?;

            if !report.is_success() {
                bail!("{} page(s) failed to build", report.failures.len());
            }
            Ok(())
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        log!("config"; "no `{}` found, using defaults", config_path.display());
        SiteConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;
    Ok(config)
}
