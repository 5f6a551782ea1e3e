//! tfmi CLI entry point.
//!
//! This binary provides the command-line interface for tfmi.

use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use tfmi::cli::{Cli, Commands, ScanArgs};
use tfmi::reporter::Reporter;
use tfmi::{Config, ScanResult, Scanner};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Configuration files looked up in the working directory.
const DEFAULT_CONFIG_FILES: &[&str] = &["tfmi.yaml", "tfmi.yml", ".tfmi.yaml"];

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(exit_code) => exit_code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");

            eprintln!("Error: {e}");

            // Print error chain (cause chain)
            let mut source = e.source();
            if source.is_some() {
                eprintln!("\nCaused by:");
                let mut i = 0;
                while let Some(cause) = source {
                    eprintln!("  {i}: {cause}");
                    source = cause.source();
                    i += 1;
                }
            }

            let code = e
                .downcast_ref::<tfmi::TfmiError>()
                .map_or(1, tfmi::TfmiError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        // RUST_LOG wins over the verbosity flag
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let base_level = match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            EnvFilter::new(format!("warn,tfmi={base_level}"))
        })
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::debug!("Loading configuration");
    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Scan(args) => {
            config.merge_cli_args(&args);
            config.validate()?;
            tracing::debug!(scope = ?config.scan.scope, "Executing scan command");

            let scanner = Scanner::new(config.clone())?;
            let result = scan(&scanner, &args).await?;

            let report = Reporter::new(&config).generate(&result, args.format)?;
            if let Some(output_path) = &args.output {
                std::fs::write(output_path, &report)?;
                tracing::info!(path = %output_path.display(), "Report written");
            } else {
                println!("{report}");
            }

            Ok(ExitCode::from(exit_code(&result, args.fail_under)))
        }

        Commands::Init => {
            let config_path = std::path::Path::new(DEFAULT_CONFIG_FILES[0]);
            if config_path.exists() {
                anyhow::bail!("Configuration file already exists: {}", config_path.display());
            }

            std::fs::write(config_path, Config::example_yaml())?;
            println!("Created example configuration: {}", config_path.display());
            Ok(ExitCode::from(0))
        }

        Commands::Validate(args) => {
            let config_content = std::fs::read_to_string(&args.config)?;
            match Config::from_yaml(&config_content) {
                Ok(_) => {
                    println!("Configuration is valid: {}", args.config.display());
                    Ok(ExitCode::from(0))
                }
                Err(e) => {
                    eprintln!("Configuration error: {e}");
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

async fn scan(scanner: &Scanner, args: &ScanArgs) -> anyhow::Result<ScanResult> {
    if let Some(list) = &args.list {
        return Ok(scanner.scan_list(list).await?);
    }
    match (&args.repo_name, args.paths.as_slice()) {
        (Some(name), [path]) => Ok(scanner.scan_path(path, Some(name.as_str())).await?),
        (Some(_), _) => anyhow::bail!("--repo-name requires exactly one path"),
        (None, paths) => Ok(scanner.scan_paths(paths).await?),
    }
}

/// 1 when any file summary falls below `fail_under`, otherwise 0.
fn exit_code(result: &ScanResult, fail_under: Option<f64>) -> u8 {
    let Some(threshold) = fail_under else {
        return 0;
    };
    let failing: Vec<_> = result
        .files
        .iter()
        .filter(|f| f.maintainability_index < threshold)
        .collect();
    for file in &failing {
        tracing::warn!(
            repository = %file.repository,
            file = %file.file_path.display(),
            mi = file.maintainability_index,
            threshold,
            "File below index threshold"
        );
    }
    u8::from(!failing.is_empty())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    if let Some(ref config_path) = cli.config {
        tracing::debug!(path = %config_path.display(), "Loading configuration from explicit path");
        let content = std::fs::read_to_string(config_path)?;
        return Ok(Config::from_yaml(&content)?);
    }

    tracing::debug!("Searching for default configuration files");
    for path in DEFAULT_CONFIG_FILES {
        if std::path::Path::new(path).exists() {
            tracing::debug!(path = %path, "Found configuration file");
            let content = std::fs::read_to_string(path)?;
            return Ok(Config::from_yaml(&content)?);
        }
    }

    tracing::debug!("No configuration file found, using default configuration");
    Ok(Config::default())
}
