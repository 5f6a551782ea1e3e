//! Command-line interface module.
//!
//! This module defines the CLI structure using Clap, including
//! all commands, arguments, and options.
//!
//! # Commands
//!
//! - `scan`: Score the Terraform blocks of directories or a repository list
//! - `init`: Create an example configuration file
//! - `validate`: Validate a configuration file
//!
//! # Example Usage
//!
//! ```bash
//! # Scan local directories
//! tfmi scan ./terraform ./modules
//!
//! # Scan every repository listed in a file
//! tfmi scan --list repos.txt --format csv --output dataset.csv
//!
//! # Treat the whole repository as one scope and gate on the index
//! tfmi scan . --scope repository --fail-under 60
//!
//! # Initialize configuration
//! tfmi init
//!
//! # Validate configuration
//! tfmi validate tfmi.yaml
//! ```

use crate::config::DEFAULT_MAX_DEPTH;
use crate::types::{ReportFormat, ScopeMode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// tfmi - Maintainability Index for Terraform/OpenTofu configuration blocks.
#[derive(Parser, Debug)]
#[command(
    name = "tfmi",
    author,
    version,
    about = "Maintainability Index for Terraform/OpenTofu configuration blocks",
    long_about = "tfmi extracts the blocks of Terraform/OpenTofu files, builds a reference \
                  graph between them, and scores each block from 0 to 100 across module \
                  quality, configuration fidelity, graph complexity, quality & compliance \
                  and integration readiness."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "TFMI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score the blocks of Terraform/OpenTofu files
    #[command(visible_alias = "s")]
    Scan(ScanArgs),

    /// Create an example configuration file
    Init,

    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Arguments for the scan command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Paths to scan (directories or .tf files), each scanned as one repository
    #[arg(value_name = "PATH", required_unless_present = "list")]
    pub paths: Vec<PathBuf>,

    /// File listing local repository paths to scan, one per line
    #[arg(short, long, value_name = "FILE", conflicts_with = "paths")]
    pub list: Option<PathBuf>,

    /// Repository name to report (default: directory name)
    #[arg(long, value_name = "NAME", conflicts_with = "list")]
    pub repo_name: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: ReportFormat,

    /// Output file path (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Scope for ratios and reference resolution
    #[arg(long, value_enum)]
    pub scope: Option<ScopeMode>,

    /// Patterns to exclude from scanning (glob patterns)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    pub exclude_patterns: Vec<String>,

    /// Stop at the first file or repository that cannot be read
    #[arg(long)]
    pub fail_fast: bool,

    /// Maximum depth for recursive directory scanning
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Include block source in the report (CSV `code` column)
    #[arg(long)]
    pub include_code: bool,

    /// Also validate files with the strict HCL parser
    #[arg(long)]
    pub strict_hcl: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Exit with code 1 if any file's index is below this value
    #[arg(long, value_name = "MI", value_parser = parse_index)]
    pub fail_under: Option<f64>,
}

/// Arguments for the validate command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(value_name = "FILE", default_value = "tfmi.yaml")]
    pub config: PathBuf,
}

fn parse_index(value: &str) -> Result<f64, String> {
    let index: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=100.0).contains(&index) {
        Ok(index)
    } else {
        Err(format!("{index} is outside 0..=100"))
    }
}
