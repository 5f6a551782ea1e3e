//! HCL file parser implementation.
//!
//! Reads Terraform files from disk and runs the block extractor over them.
//! The `hcl-rs` crate is used only for the optional strict validation pass.

use crate::config::Config;
use crate::error::{ErrorCollector, Result, TfmiError};
use crate::parser::{extract_blocks, ParsedFile, Parser, SKIP_FILES, TERRAFORM_EXTENSIONS};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Source text of the Terraform files under one root, keyed by relative path.
#[derive(Debug, Default)]
pub struct SourceFiles {
    pub files: BTreeMap<PathBuf, String>,
    /// Files that could not be read
    pub errors: Vec<TfmiError>,
}

/// HCL parser for Terraform/OpenTofu files.
///
/// The parser walks directories, reads `.tf` files, and extracts blocks.
pub struct HclParser {
    exclude_patterns: Vec<glob::Pattern>,
    continue_on_error: bool,
    max_depth: usize,
    strict_hcl: bool,
}

impl HclParser {
    /// Create a new HCL parser with the given configuration.
    ///
    /// Invalid exclude patterns are ignored; [`Config::validate`] reports them.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            exclude_patterns: config
                .scan
                .exclude_patterns
                .iter()
                .filter_map(|p| glob::Pattern::new(p).ok())
                .collect(),
            continue_on_error: config.scan.continue_on_error,
            max_depth: config.scan.max_depth,
            strict_hcl: config.scan.strict_hcl,
        }
    }

    /// Read all Terraform files under `path`.
    ///
    /// `path` may also name a single `.tf` file. Keys of the returned map are
    /// relative to `path` (a single file is keyed by its file name).
    ///
    /// # Errors
    ///
    /// Returns an error if the path doesn't exist, or if a file cannot be
    /// read and `continue_on_error` is disabled.
    pub async fn read_directory(&self, path: &Path) -> Result<SourceFiles> {
        if path.is_file() {
            let name = path.file_name().map_or_else(|| path.to_path_buf(), PathBuf::from);
            let content = read_lossy(path).await?;
            return Ok(SourceFiles {
                files: BTreeMap::from([(name, content)]),
                errors: Vec::new(),
            });
        }
        if !path.is_dir() {
            return Err(crate::err!(DirectoryNotFound {
                path: path.to_path_buf(),
            }));
        }

        let mut sources = SourceFiles::default();
        let mut error_collector = ErrorCollector::new();

        for entry in WalkDir::new(path)
            .follow_links(true)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.should_skip(e.path(), path))
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read directory entry");
                    continue;
                }
            };

            let file_path = entry.path();
            if file_path.is_dir() || !self.is_terraform_file(file_path) {
                continue;
            }

            tracing::debug!(file = %file_path.display(), "Reading file");
            match read_lossy(file_path).await {
                Ok(content) => {
                    let relative = file_path.strip_prefix(path).unwrap_or(file_path);
                    sources.files.insert(relative.to_path_buf(), content);
                }
                Err(e) if self.continue_on_error => {
                    tracing::warn!(file = %file_path.display(), error = %e, "Failed to read file, continuing");
                    error_collector.add(e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            root = %path.display(),
            files = sources.files.len(),
            errors = error_collector.count(),
            "Directory read complete"
        );

        sources.errors = error_collector.into_errors();
        Ok(sources)
    }

    /// Check if a path should be skipped.
    fn should_skip(&self, path: &Path, root: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if file_name.starts_with('.') {
            tracing::debug!(path = %path.display(), reason = "hidden file/directory", "Skipping path");
            return true;
        }

        if SKIP_FILES.iter().any(|s| file_name == *s) {
            tracing::debug!(path = %path.display(), reason = "known skip file", "Skipping path");
            return true;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if self
            .exclude_patterns
            .iter()
            .any(|p| p.matches(file_name) || p.matches_path(relative))
        {
            tracing::debug!(path = %path.display(), reason = "matches exclude pattern", "Skipping path");
            return true;
        }

        false
    }

    /// Check if a file is a Terraform file.
    fn is_terraform_file(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        TERRAFORM_EXTENSIONS
            .iter()
            .any(|ext| path_str.ends_with(ext))
    }

    /// Run the strict `hcl-rs` parser over a file. Reports a parse failure,
    /// or a top-level block count that differs from what the extractor kept.
    fn strict_check(&self, content: &str, file_path: &Path, extracted: usize) -> Option<TfmiError> {
        match ::hcl::from_str::<::hcl::Body>(content) {
            Ok(body) => {
                let blocks = body
                    .into_inner()
                    .into_iter()
                    .filter(|s| matches!(s, ::hcl::Structure::Block(_)))
                    .count();
                if blocks == extracted {
                    return None;
                }
                tracing::info!(
                    file = %file_path.display(),
                    strict = blocks,
                    extracted,
                    "Strict parser found a different number of blocks"
                );
                Some(crate::err!(StrictHcl {
                    file: file_path.to_path_buf(),
                    message: format!(
                        "strict parser found {blocks} top-level block(s), {extracted} extracted"
                    ),
                }))
            }
            Err(e) => {
                tracing::info!(file = %file_path.display(), error = %e, "Strict HCL parse failed");
                Some(crate::err!(StrictHcl {
                    file: file_path.to_path_buf(),
                    message: e.to_string(),
                }))
            }
        }
    }
}

impl Parser for HclParser {
    fn parse_content(&self, content: &str, file_path: &Path) -> ParsedFile {
        let extraction = extract_blocks(content);

        let mut errors: Vec<TfmiError> = extraction
            .issues
            .into_iter()
            .map(|issue| {
                tracing::warn!(
                    file = %file_path.display(),
                    line = issue.line,
                    "{}",
                    issue.message
                );
                crate::err!(BlockSyntax {
                    file: file_path.to_path_buf(),
                    line: issue.line,
                    message: issue.message,
                })
            })
            .collect();

        if self.strict_hcl {
            errors.extend(self.strict_check(content, file_path, extraction.blocks.len()));
        }

        tracing::debug!(
            file = %file_path.display(),
            blocks = extraction.blocks.len(),
            errors = errors.len(),
            "Parsed file"
        );

        ParsedFile {
            path: file_path.to_path_buf(),
            blocks: extraction.blocks,
            errors,
        }
    }
}

async fn read_lossy(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TfmiError::io(path, e, file!(), line!()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
