//! Per-file aggregation of block scores.

use crate::types::{BlockReport, FileSummary};
use std::path::Path;

/// Summarize the blocks of one file.
///
/// The file index is the arithmetic mean of its block indices. Returns `None`
/// for a file without blocks; such a file has no score.
#[must_use]
pub fn summarize_file(repository: &str, file_path: &Path, blocks: &[&BlockReport]) -> Option<FileSummary> {
    if blocks.is_empty() {
        return None;
    }

    let total: f64 = blocks.iter().map(|b| b.scores.maintainability_index).sum();
    Some(FileSummary {
        repository: repository.to_string(),
        file_path: file_path.to_path_buf(),
        block_count: blocks.len(),
        start_line: blocks.iter().map(|b| b.id.start_line).min().unwrap_or(0),
        end_line: blocks.iter().map(|b| b.end_line).max().unwrap_or(0),
        loc: blocks.iter().map(|b| b.loc).sum(),
        maintainability_index: total / blocks.len() as f64,
    })
}
