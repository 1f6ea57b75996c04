//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use crate::config::OutputMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Folio page compiler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: folio.toml)
    #[arg(short = 'C', long, default_value = "folio.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments of the build command
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Run every step except writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Where written pages go
    #[arg(long, value_enum)]
    pub to: Option<OutputMode>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Template files to compile, relative to the input directory
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile the given templates and write their pages
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },
}
