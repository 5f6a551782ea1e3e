//! Configuration module for tfmi.
//!
//! This module handles loading and validating configuration from:
//! - YAML configuration files (`tfmi.yaml`)
//! - Environment variables
//! - CLI arguments
//!
//! # Configuration File Format
//!
//! ```yaml
//! # tfmi.yaml
//!
//! # Scanning options
//! scan:
//!   exclude_patterns:
//!     - "**/.terraform/**"
//!   continue_on_error: true
//!   max_depth: 100
//!   scope: file          # or: repository
//!   strict_hcl: false
//!
//! # Analysis options
//! analysis:
//!   deprecated_functions: [list, map]
//!   max_traversal_depth: 256
//!
//! # Output options
//! output:
//!   colored: true
//!   pretty: true
//!   include_code: false
//!
//! # Scoring calibration (any field may be overridden)
//! scoring:
//!   weights:
//!     module_quality: 0.25
//! ```

use crate::error::{Result, TfmiError};
use crate::graph::DEFAULT_MAX_TRAVERSAL_DEPTH;
use crate::scoring::Calibration;
use crate::types::ScopeMode;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static BRACED_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("Invalid regex"));

static BARE_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex"));

/// Default value of `--max-depth`.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Scanning options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Patterns to exclude from scanning (glob patterns).
    pub exclude_patterns: Vec<String>,

    /// Continue scanning when a file cannot be read.
    pub continue_on_error: bool,

    /// Maximum depth for recursive directory scanning.
    pub max_depth: usize,

    /// Scope used for ratios and reference resolution.
    pub scope: ScopeMode,

    /// Also run the strict HCL parser and report its failures.
    pub strict_hcl: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude_patterns: vec!["**/.terraform/**".to_string()],
            continue_on_error: true,
            max_depth: DEFAULT_MAX_DEPTH,
            scope: ScopeMode::File,
            strict_hcl: false,
        }
    }
}

/// Analysis options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Function names counted as deprecated calls.
    pub deprecated_functions: Vec<String>,

    /// Cap on the length of a followed reference chain.
    pub max_traversal_depth: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            deprecated_functions: vec!["list".to_string(), "map".to_string()],
            max_traversal_depth: DEFAULT_MAX_TRAVERSAL_DEPTH,
        }
    }
}

/// Output options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Use colored output.
    pub colored: bool,

    /// Verbose output mode.
    pub verbose: bool,

    /// Pretty-print JSON output.
    pub pretty: bool,

    /// Keep block source text in reports (CSV `code` column).
    pub include_code: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            colored: true,
            verbose: false,
            pretty: true,
            include_code: false,
        }
    }
}

/// Main configuration structure with nested sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scanning options
    pub scan: ScanOptions,

    /// Analysis options
    pub analysis: AnalysisOptions,

    /// Output options
    pub output: OutputOptions,

    /// Scoring calibration
    pub scoring: Calibration,
}

impl Config {
    /// Load configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigParse` if the YAML is invalid and `ConfigValue` if a
    /// value is out of range.
    pub fn from_yaml(content: &str) -> Result<Self> {
        tracing::debug!("Parsing configuration from YAML");
        let expanded = expand_env_vars(content);

        let config: Config = serde_yaml::from_str(&expanded).map_err(|e| {
            TfmiError::config_parse(e.to_string(), Some(Box::new(e)), file!(), line!())
        })?;
        config.validate()?;

        tracing::debug!(
            exclude_patterns = config.scan.exclude_patterns.len(),
            scope = ?config.scan.scope,
            deprecated_functions = config.analysis.deprecated_functions.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;

        if self.analysis.max_traversal_depth == 0 {
            return Err(crate::err!(ConfigValue {
                key: "analysis.max_traversal_depth".to_string(),
                message: "must be at least 1".to_string(),
            }));
        }

        for pattern in &self.scan.exclude_patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(crate::err!(ConfigValue {
                    key: "scan.exclude_patterns".to_string(),
                    message: format!("invalid glob '{pattern}': {e}"),
                }));
            }
        }

        Ok(())
    }

    /// Generate an example YAML configuration.
    #[must_use]
    pub fn example_yaml() -> String {
        r#"# tfmi configuration file

# Scanning options
scan:
  # Patterns to exclude from scanning (glob patterns)
  exclude_patterns:
    - "**/.terraform/**"

  # Keep going when a file cannot be read
  continue_on_error: true

  # Maximum depth for recursive directory scanning
  max_depth: 100

  # Scope for ratios and reference resolution: file | repository
  scope: file

  # Also run the strict HCL parser and report its failures
  strict_hcl: false

# Analysis options
analysis:
  # Calls to these functions lower the compliance score
  deprecated_functions:
    - list
    - map

  # Cap on the length of a followed reference chain
  max_traversal_depth: 256

# Output options
output:
  # Use colored output in terminal
  colored: true

  # Enable verbose output
  verbose: false

  # Pretty-print JSON output
  pretty: true

  # Keep block source in the CSV `code` column
  include_code: false

# Scoring calibration. Omitted fields keep their defaults.
scoring:
  weights:
    module_quality: 0.25
    configuration_fidelity: 0.25
    graph_complexity: 0.20
    quality_compliance: 0.20
    integration_readiness: 0.10

  # coupling:
  #   weight: 0.35
  #   curve:
  #     shape: plateau
  #     max: 90
  #     low: 0
  #     high: 3
  #     above: { width: 3, edge: 60, decay: 0.15 }

  # deprecated_functions:
  #   weight: 0.40
  #   curve:
  #     shape: penalty
  #     max: 90
  #     per_occurrence: 35
"#
        .to_string()
    }

    /// Merge CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &crate::cli::ScanArgs) {
        if !args.exclude_patterns.is_empty() {
            self.scan
                .exclude_patterns
                .extend(args.exclude_patterns.iter().cloned());
        }
        if args.fail_fast {
            self.scan.continue_on_error = false;
        }
        if args.max_depth != DEFAULT_MAX_DEPTH {
            self.scan.max_depth = args.max_depth;
        }
        if let Some(scope) = args.scope {
            self.scan.scope = scope;
        }
        if args.strict_hcl {
            self.scan.strict_hcl = true;
        }
        if args.include_code {
            self.output.include_code = true;
        }
        if args.no_color {
            self.output.colored = false;
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax. Unset variables are left as written.
fn expand_env_vars(content: &str) -> String {
    let braced = BRACED_VAR.replace_all(content, |cap: &regex::Captures<'_>| {
        std::env::var(&cap[1]).unwrap_or_else(|_| cap[0].to_string())
    });
    BARE_VAR
        .replace_all(&braced, |cap: &regex::Captures<'_>| {
            std::env::var(&cap[1]).unwrap_or_else(|_| cap[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubMetric;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.max_depth, 100);
        assert_eq!(config.scan.scope, ScopeMode::File);
        assert!(config.scan.continue_on_error);
        assert_eq!(config.analysis.deprecated_functions, vec!["list", "map"]);
        assert_eq!(config.analysis.max_traversal_depth, 256);
        assert!(!config.output.include_code);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_from_yaml_nested() {
        let yaml = r#"
scan:
  exclude_patterns:
    - "**/vendor/**"
  max_depth: 50
  scope: repository
analysis:
  deprecated_functions: [list]
output:
  colored: false
  include_code: true
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.scan.exclude_patterns, vec!["**/vendor/**"]);
        assert_eq!(config.scan.max_depth, 50);
        assert_eq!(config.scan.scope, ScopeMode::Repository);
        assert_eq!(config.analysis.deprecated_functions, vec!["list"]);
        assert_eq!(config.analysis.max_traversal_depth, 256);
        assert!(!config.output.colored);
        assert!(config.output.include_code);
    }

    #[test]
    fn test_merge_cli_args() {
        use crate::cli::{Cli, Commands};
        use clap::Parser;

        let scan_args = |argv: &[&str]| match Cli::parse_from(argv.iter().copied()).command {
            Commands::Scan(args) => args,
            _ => panic!("Expected Scan command"),
        };

        let mut config = Config::default();
        config.merge_cli_args(&scan_args(&["tfmi", "scan", "."]));
        assert!(config.scan.continue_on_error);
        assert_eq!(config.scan.scope, ScopeMode::File);

        config.merge_cli_args(&scan_args(&[
            "tfmi",
            "scan",
            ".",
            "--fail-fast",
            "--scope",
            "repository",
            "--exclude",
            "legacy/**",
        ]));
        assert!(!config.scan.continue_on_error);
        assert_eq!(config.scan.scope, ScopeMode::Repository);
        assert_eq!(
            config.scan.exclude_patterns,
            vec!["**/.terraform/**", "legacy/**"]
        );
    }

    #[test]
    fn test_scoring_override_keeps_other_defaults() {
        let yaml = r#"
scoring:
  weights:
    module_quality: 0.30
    integration_readiness: 0.05
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!((config.scoring.weights.module_quality - 0.30).abs() < 1e-12);
        assert_eq!(
            config.scoring.metric(SubMetric::Coupling),
            Calibration::default().metric(SubMetric::Coupling)
        );
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let yaml = r#"
scoring:
  weights:
    module_quality: 0.9
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, TfmiError::ConfigValue { .. }), "{err}");
    }

    #[test]
    fn test_zero_traversal_depth_is_rejected() {
        let err = Config::from_yaml("analysis:\n  max_traversal_depth: 0\n").unwrap_err();
        match err {
            TfmiError::ConfigValue { key, .. } => assert_eq!(key, "analysis.max_traversal_depth"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        let err = Config::from_yaml("scan:\n  exclude_patterns: [\"a/[b\"]\n").unwrap_err();
        assert!(matches!(err, TfmiError::ConfigValue { .. }));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = Config::from_yaml("scan: [unclosed").unwrap_err();
        assert!(matches!(err, TfmiError::ConfigParse { .. }));
        assert_eq!(err.exit_code(), 18);
    }

    #[test]
    fn test_env_var_expansion() {
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(expand_env_vars("dir: ${PATH}"), format!("dir: {path}"));
        }
        assert_eq!(
            expand_env_vars("a: ${TFMI_SURELY_UNSET_VAR_123}"),
            "a: ${TFMI_SURELY_UNSET_VAR_123}"
        );
        assert_eq!(expand_env_vars("no vars here"), "no vars here");
    }

    #[test]
    fn test_example_yaml_is_valid() {
        let config = Config::from_yaml(&Config::example_yaml()).unwrap();
        assert_eq!(config.scoring, Calibration::default());
        assert_eq!(config.analysis.deprecated_functions, vec!["list", "map"]);
    }
}
