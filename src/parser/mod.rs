//! HCL parsing module for Terraform/OpenTofu files.
//!
//! This module turns source text into [`Block`] trees. It is split into
//! three layers:
//!
//! - [`lexer`]: a grammar-aware tokenizer that understands quoted templates,
//!   heredocs, interpolation and comments, so braces inside strings never
//!   affect block structure
//! - [`extract`]: a tolerant recursive-descent extractor that builds the
//!   block tree and skips malformed declarations
//! - [`classify`]: the attribute classifier (hard-coded vs. reference, and
//!   the identifiers an expression references)
//!
//! [`HclParser`] is the file-system shell around them: it walks directories,
//! reads files, and records syntax problems as recoverable errors.
//!
//! # Example
//!
//! ```rust
//! use tfmi::parser::{HclParser, Parser};
//! use tfmi::Config;
//! use std::path::Path;
//!
//! let parser = HclParser::new(&Config::default());
//! let parsed = parser.parse_content("variable \"region\" {}\n", Path::new("variables.tf"));
//! assert_eq!(parsed.blocks.len(), 1);
//! assert!(parsed.errors.is_empty());
//! ```

pub mod classify;
pub mod extract;
mod hcl;
pub mod lexer;

pub use classify::{classify_expression, Classification};
pub use extract::{extract_blocks, Extraction, SyntaxIssue};
pub use hcl::{HclParser, SourceFiles};

use crate::error::TfmiError;
use crate::types::Block;
use std::path::{Path, PathBuf};

/// File extensions to scan for Terraform/OpenTofu files.
pub const TERRAFORM_EXTENSIONS: &[&str] = &[".tf"];

/// Files to skip during scanning.
pub const SKIP_FILES: &[&str] = &[".terraform", ".terragrunt-cache", "terraform.tfstate"];

/// Blocks of one file plus the recoverable problems found while parsing it.
#[derive(Debug, Default)]
pub struct ParsedFile {
    /// Path relative to the scanned root
    pub path: PathBuf,
    pub blocks: Vec<Block>,
    /// `BlockSyntax` and `StrictHcl` errors
    pub errors: Vec<TfmiError>,
}

/// Trait for parsing HCL content.
///
/// This trait allows for different parsing implementations
/// (e.g., for testing with fixed block sets).
pub trait Parser: Send + Sync {
    /// Parse a single file's contents. Never fails: syntax problems are
    /// returned in [`ParsedFile::errors`].
    fn parse_content(&self, content: &str, file_path: &Path) -> ParsedFile;
}
