//! Error types for tfmi.
//!
//! This module defines the error hierarchy using `thiserror`. Errors carry
//! the source location where they were raised (via the [`err!`](crate::err)
//! macro) so diagnostics point back at the code that produced them.
//!
//! # Error Categories
//!
//! - **Block syntax errors**: unbalanced or unrecognized declarations. The
//!   offending declaration is skipped and extraction continues.
//! - **Empty scope**: a file or repository without analyzable blocks. No score
//!   record is produced.
//! - **Metric domain errors**: a raw metric outside its defined domain. The
//!   value is clamped to the nearest boundary and scoring proceeds.
//! - **IO / config / report errors**: raised by the scanner shell and the CLI.
//!
//! None of the core categories is fatal to a batch: the core records them as
//! per-file [`Diagnostic`](crate::types::Diagnostic)s instead of returning them.
//!
//! # Example
//!
//! ```rust
//! use tfmi::error::{TfmiError, Result};
//!
//! fn read(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path).map_err(|e| TfmiError::io(path, e, file!(), line!()))
//! }
//! ```

use crate::types::{Diagnostic, DiagnosticKind};
use std::path::PathBuf;
use thiserror::Error;

/// Macro to create errors with automatic source location tracking.
///
/// Usage:
/// ```ignore
/// return Err(err!(ConfigValue { key: "scoring".to_string(), message: "bad".to_string() }));
/// ```
#[macro_export]
macro_rules! err {
    ($variant:ident { $($field:ident: $value:expr),* $(,)? }) => {
        $crate::error::TfmiError::$variant {
            $($field: $value,)*
            src_path: file!(),
            src_line: line!(),
        }
    };
}

/// A specialized Result type for tfmi operations.
pub type Result<T> = std::result::Result<T, TfmiError>;

/// The main error type for tfmi.
#[derive(Error, Debug)]
pub enum TfmiError {
    // =========================================================================
    // I/O and File System Errors
    // =========================================================================
    /// I/O error with path context.
    #[error("I/O error at '{path}' ({src_path}:{src_line}): {source}")]
    Io {
        /// The path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Directory not found.
    #[error("Directory not found: {path} ({src_path}:{src_line})")]
    DirectoryNotFound {
        /// The missing directory path
        path: PathBuf,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Core Errors (collected as diagnostics, never fatal)
    // =========================================================================
    /// Unbalanced or unrecognized block syntax.
    #[error("Block syntax error in '{file}' at line {line} ({src_path}:{src_line}): {message}")]
    BlockSyntax {
        /// The file being parsed
        file: PathBuf,
        /// 1-based line where the offending declaration starts
        line: usize,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A file or repository produced no analyzable blocks.
    #[error("No analyzable blocks in '{scope}' ({src_path}:{src_line})")]
    EmptyScope {
        /// The file path or repository name
        scope: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// A raw metric fell outside its mathematically defined domain.
    #[error("Metric '{metric}' out of domain ({src_path}:{src_line}): {value} clamped to {clamped}")]
    MetricDomain {
        /// Sub-metric name
        metric: String,
        /// The offending raw value
        value: f64,
        /// The value used instead
        clamped: f64,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// The strict HCL parser rejected a file the tolerant extractor accepted.
    #[error("Strict HCL parse failed for '{file}' ({src_path}:{src_line}): {message}")]
    StrictHcl {
        /// The file being parsed
        file: PathBuf,
        /// Parser message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration parsing error.
    #[error("Failed to parse configuration ({src_path}:{src_line}): {message}")]
    ConfigParse {
        /// Error message
        message: String,
        /// The underlying error (if any)
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}' ({src_path}:{src_line}): {message}")]
    ConfigValue {
        /// The configuration key
        key: String,
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },

    // =========================================================================
    // Report Errors
    // =========================================================================
    /// Report generation error.
    #[error("Failed to generate report ({src_path}:{src_line}): {message}")]
    ReportGeneration {
        /// Error message
        message: String,
        /// Source file path
        src_path: &'static str,
        /// Source line number
        src_line: u32,
    },
}

impl TfmiError {
    /// Creates an `Io` error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error, src_path: &'static str, src_line: u32) -> Self {
        Self::Io { path: path.into(), source, src_path, src_line }
    }

    /// Creates a `ConfigParse` error.
    #[must_use]
    pub fn config_parse(message: String, source: Option<Box<dyn std::error::Error + Send + Sync>>, src_path: &'static str, src_line: u32) -> Self {
        Self::ConfigParse { message, source, src_path, src_line }
    }

    /// Determines if the error is recoverable (scanning of sibling files and
    /// repositories should continue).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::BlockSyntax { .. }
            | Self::EmptyScope { .. }
            | Self::MetricDomain { .. }
            | Self::StrictHcl { .. }
            | Self::Io { .. }
            | Self::DirectoryNotFound { .. } => true,
            Self::ConfigParse { .. }
            | Self::ConfigValue { .. }
            | Self::ReportGeneration { .. } => false,
        }
    }

    /// The diagnostic category for errors the core records instead of returning.
    #[must_use]
    pub fn diagnostic_kind(&self) -> Option<DiagnosticKind> {
        match self {
            Self::BlockSyntax { .. } => Some(DiagnosticKind::Parse),
            Self::EmptyScope { .. } => Some(DiagnosticKind::EmptyScope),
            Self::MetricDomain { .. } => Some(DiagnosticKind::MetricDomain),
            Self::StrictHcl { .. } => Some(DiagnosticKind::StrictHcl),
            Self::Io { .. } | Self::DirectoryNotFound { .. } => Some(DiagnosticKind::Io),
            _ => None,
        }
    }

    /// Convert a recorded error into a report diagnostic. Source locations
    /// are left out; they only matter in logs.
    #[must_use]
    pub fn to_diagnostic(&self, repository: &str) -> Option<Diagnostic> {
        let kind = self.diagnostic_kind()?;
        let (file, line, message) = match self {
            Self::BlockSyntax { file, line, message, .. } => {
                (Some(file.clone()), Some(*line), message.clone())
            }
            Self::EmptyScope { scope, .. } => (
                Some(PathBuf::from(scope)),
                None,
                "no analyzable blocks".to_string(),
            ),
            Self::MetricDomain { metric, value, clamped, .. } => (
                None,
                None,
                format!("{metric} value {value} clamped to {clamped}"),
            ),
            Self::StrictHcl { file, message, .. } => (Some(file.clone()), None, message.clone()),
            Self::Io { path, source, .. } => (Some(path.clone()), None, source.to_string()),
            Self::DirectoryNotFound { path, .. } => {
                (Some(path.clone()), None, "directory not found".to_string())
            }
            _ => return None,
        };
        Some(Diagnostic {
            kind,
            repository: repository.to_string(),
            file,
            line,
            message,
        })
    }

    /// Returns the appropriate exit code for the error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => 13,
            Self::DirectoryNotFound { .. } => 15,
            Self::ConfigParse { .. } => 18,
            Self::ConfigValue { .. } => 19,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for TfmiError {
    fn from(source: std::io::Error) -> Self {
        // Prefer TfmiError::io(path, ...) when the path is known.
        Self::Io {
            path: PathBuf::new(),
            source,
            src_path: file!(),
            src_line: line!(),
        }
    }
}

impl From<serde_json::Error> for TfmiError {
    fn from(source: serde_json::Error) -> Self {
        Self::ReportGeneration {
            message: format!("JSON serialization error: {source}"),
            src_path: file!(),
            src_line: line!(),
        }
    }
}

impl From<csv::Error> for TfmiError {
    fn from(source: csv::Error) -> Self {
        Self::ReportGeneration {
            message: format!("CSV serialization error: {source}"),
            src_path: file!(),
            src_line: line!(),
        }
    }
}

/// Recoverable errors gathered while reading a directory, handed to the
/// scanner as diagnostics.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<TfmiError>,
}

impl ErrorCollector {
    /// Create a new error collector.
    #[must_use]
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Add an error to the collection.
    pub fn add(&mut self, error: TfmiError) {
        self.errors.push(error);
    }

    /// Get the number of collected errors.
    #[must_use]
    pub fn count(&self) -> usize {
        self.errors.len()
    }

    /// Take the collected errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<TfmiError> {
        self.errors
    }
}
