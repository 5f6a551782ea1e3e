//! Report generation module.
//!
//! This module provides report generation in multiple formats:
//! - Text: Human-readable CLI output with per-block and per-file tables
//! - JSON: Machine-readable structured output
//! - CSV: One row per block plus one `FILE_SUMMARY` row per file
//!
//! # Example
//!
//! ```rust,no_run
//! use tfmi::reporter::Reporter;
//! use tfmi::{Config, ReportFormat, ScanResult};
//!
//! let config = Config::default();
//! let reporter = Reporter::new(&config);
//!
//! let result = ScanResult::default();
//! let csv = reporter.generate(&result, ReportFormat::Csv).unwrap();
//! assert!(csv.starts_with("repository,file_path"));
//! ```

mod csv;
mod json;
mod text;

use crate::config::Config;
use crate::error::Result;
use crate::types::{ReportFormat, ScanResult};

pub use self::csv::{CsvReporter, CSV_COLUMNS, FILE_SUMMARY_TYPE};
pub use json::JsonReporter;
pub use text::TextReporter;

/// Report generator that supports multiple output formats.
pub struct Reporter {
    config: Config,
}

impl Reporter {
    /// Create a new reporter with the given configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Generate a report in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if report generation fails.
    pub fn generate(&self, result: &ScanResult, format: ReportFormat) -> Result<String> {
        tracing::debug!(?format, blocks = result.blocks.len(), "Generating report");
        match format {
            ReportFormat::Text => TextReporter::new(&self.config).generate(result),
            ReportFormat::Json => JsonReporter::new(&self.config).generate(result),
            ReportFormat::Csv => CsvReporter::new(&self.config).generate(result),
        }
    }
}

/// Trait for report generators.
pub trait ReportGenerator {
    /// Generate a report from scan results.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails.
    fn generate(&self, result: &ScanResult) -> Result<String>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_by_format() {
        let result = test_support::sample_result(false);
        let reporter = Reporter::new(&Config::default());

        let json = reporter.generate(&result, ReportFormat::Json).unwrap();
        assert!(json.trim_start().starts_with('{'));

        let csv = reporter.generate(&result, ReportFormat::Csv).unwrap();
        assert!(csv.starts_with("repository,file_path,block_type"));

        let text = reporter.generate(&result, ReportFormat::Text).unwrap();
        assert!(text.contains("Summary"));
    }
}
