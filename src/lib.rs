//! # tfmi
//!
//! A Maintainability Index for Terraform/OpenTofu configuration blocks.
//!
//! tfmi scans Terraform repositories, extracts every top-level block, builds
//! a reference graph between blocks, computes fourteen structural metrics per
//! block, and maps them through calibrated scoring curves to a 0-100 index.
//!
//! ## Features
//!
//! - **Tolerant extraction**: grammar-aware block extraction that skips
//!   malformed declarations and keeps going
//! - **Reference graph**: coupling and cycle-safe reference chain depth
//! - **Five categories**: module quality, configuration fidelity, graph
//!   complexity, quality & compliance, integration readiness
//! - **Configurable calibration**: every weight and curve can be overridden
//!   in `tfmi.yaml`
//! - **Multiple output formats**: plain text, JSON and a CSV dataset
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfmi::{Config, Scanner, ReportFormat};
//! use tfmi::reporter::Reporter;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let scanner = Scanner::new(config.clone())?;
//!
//!     // Scan a local directory
//!     let result = scanner.scan_path("./terraform", None).await?;
//!
//!     // Generate a report
//!     let report = Reporter::new(&config).generate(&result, ReportFormat::Json)?;
//!     println!("{report}");
//!
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod parser;
pub mod reporter;
pub mod scoring;
pub mod types;

// Re-export commonly used types at crate root
pub use config::Config;
pub use error::{Result, TfmiError};
pub use types::{
    Block, BlockKind, BlockReport, Diagnostic, DiagnosticKind, FileSummary, MetricVector,
    ReportFormat, ScanResult, ScopeMode, ScoreVector,
};

use analyzer::{MetricCalculator, ScopeProfile};
use graph::ReferenceGraphBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use parser::{HclParser, ParsedFile, Parser};
use rayon::prelude::*;
use scoring::{summarize_file, ScoringEngine};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main scanner orchestrator that coordinates all analysis operations.
///
/// The `Scanner` is the primary entry point for using tfmi as a library.
/// It handles:
/// - Reading local directories and repository lists
/// - Coordinating extraction, graph building, metric calculation and scoring
/// - Recording non-fatal problems as diagnostics
///
/// [`Scanner::analyze_sources`] is the synchronous core: it never touches the
/// file system and its output depends only on its input.
///
/// # Example
///
/// ```rust
/// use tfmi::{Config, Scanner};
/// use std::collections::BTreeMap;
/// use std::path::PathBuf;
///
/// let scanner = Scanner::new(Config::default()).unwrap();
/// let sources = BTreeMap::from([(
///     PathBuf::from("main.tf"),
///     "resource \"aws_vpc\" \"main\" {\n  cidr_block = var.cidr\n}\n".to_string(),
/// )]);
///
/// let result = scanner.analyze_sources("network", &sources);
/// assert_eq!(result.blocks.len(), 1);
/// assert_eq!(result.files.len(), 1);
/// ```
pub struct Scanner {
    config: Config,
    parser: HclParser,
    calculator: MetricCalculator,
    engine: ScoringEngine,
    graph_builder: ReferenceGraphBuilder,
}

impl Scanner {
    /// Create a new scanner with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigValue` if the configuration (including the scoring
    /// calibration) is invalid.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parser: HclParser::new(&config),
            calculator: MetricCalculator::new(&config),
            engine: ScoringEngine::new(config.scoring.clone())?,
            graph_builder: ReferenceGraphBuilder::new(config.analysis.max_traversal_depth),
            config,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyze in-memory sources of one repository.
    ///
    /// Files are extracted in parallel; blocks are grouped into scopes
    /// according to `scan.scope`, each scope gets its own reference graph,
    /// and every block is scored. Results are ordered by file path, then by
    /// source position.
    #[must_use]
    pub fn analyze_sources(&self, repository: &str, sources: &BTreeMap<PathBuf, String>) -> ScanResult {
        tracing::info!(repository = %repository, files = sources.len(), "Analyzing repository");

        let entries: Vec<(&PathBuf, &String)> = sources.iter().collect();
        let parsed: Vec<ParsedFile> = entries
            .par_iter()
            .map(|(path, content)| self.parser.parse_content(content, path))
            .collect();

        let mut result = ScanResult {
            repositories: vec![repository.to_string()],
            files_scanned: parsed.len(),
            ..ScanResult::default()
        };

        for file in &parsed {
            result
                .diagnostics
                .extend(file.errors.iter().filter_map(|e| e.to_diagnostic(repository)));
            if file.blocks.is_empty() && self.config.scan.scope == ScopeMode::File {
                let error = crate::err!(EmptyScope {
                    scope: file.path.display().to_string(),
                });
                tracing::info!(repository = %repository, file = %file.path.display(), "No analyzable blocks in file");
                result.diagnostics.extend(error.to_diagnostic(repository));
            }
        }

        let scopes: Vec<Vec<&ParsedFile>> = match self.config.scan.scope {
            ScopeMode::File => parsed.iter().map(|f| vec![f]).collect(),
            ScopeMode::Repository => vec![parsed.iter().collect()],
        };

        for scope in scopes {
            let members: Vec<(&ParsedFile, &Block)> = scope
                .iter()
                .flat_map(|file| file.blocks.iter().map(move |b| (*file, b)))
                .collect();
            if members.is_empty() {
                if self.config.scan.scope == ScopeMode::Repository {
                    let error = crate::err!(EmptyScope {
                        scope: repository.to_string(),
                    });
                    tracing::info!(repository = %repository, "No analyzable blocks in repository");
                    result.diagnostics.extend(error.to_diagnostic(repository));
                }
                continue;
            }
            let (reports, diagnostics) = self.score_scope(repository, &members);
            result.blocks.extend(reports);
            result.diagnostics.extend(diagnostics);
        }

        for file in &parsed {
            let blocks: Vec<&BlockReport> = result
                .blocks
                .iter()
                .filter(|b| b.id.file_path == file.path)
                .collect();
            if let Some(summary) = summarize_file(repository, &file.path, &blocks) {
                result.files.push(summary);
            }
        }

        tracing::info!(
            repository = %repository,
            blocks = result.blocks.len(),
            files = result.files.len(),
            diagnostics = result.diagnostics.len(),
            "Analysis complete"
        );
        result
    }

    /// Build the graph of one scope and score its blocks.
    fn score_scope(
        &self,
        repository: &str,
        members: &[(&ParsedFile, &Block)],
    ) -> (Vec<BlockReport>, Vec<Diagnostic>) {
        let blocks: Vec<&Block> = members.iter().map(|(_, b)| *b).collect();
        let profile = ScopeProfile::from_blocks(&blocks);
        let graph = self.graph_builder.build(&blocks);
        let couplings = graph.all_couplings();
        let depths = graph.all_depths();

        let scored: Vec<(BlockReport, Vec<Diagnostic>)> = members
            .par_iter()
            .enumerate()
            .map(|(i, (file, block))| {
                let metrics = self.calculator.compute(block, &profile, couplings[i], depths[i]);
                let (scores, domain_errors) = self.engine.score(&metrics);
                let diagnostics = domain_errors
                    .iter()
                    .filter_map(|e| e.to_diagnostic(repository))
                    .map(|mut d| {
                        d.file = Some(file.path.clone());
                        d.line = Some(block.start_line);
                        d
                    })
                    .collect();
                (self.block_report(repository, &file.path, block, metrics, scores), diagnostics)
            })
            .collect();

        let mut reports = Vec::with_capacity(scored.len());
        let mut diagnostics = Vec::new();
        for (report, block_diagnostics) in scored {
            reports.push(report);
            diagnostics.extend(block_diagnostics);
        }
        (reports, diagnostics)
    }

    fn block_report(
        &self,
        repository: &str,
        file_path: &Path,
        block: &Block,
        metrics: MetricVector,
        scores: ScoreVector,
    ) -> BlockReport {
        tracing::trace!(
            block = %block.id(),
            mi = scores.maintainability_index,
            "Scored block"
        );
        BlockReport {
            repository: repository.to_string(),
            id: types::BlockId {
                file_path: file_path.to_path_buf(),
                kind: block.kind,
                type_label: block.type_label.clone(),
                name: block.name.clone(),
                start_line: block.start_line,
            },
            block_name: block.display_name(),
            block_type: block.keyword().to_string(),
            end_line: block.end_line,
            loc: block.line_count,
            metrics,
            scores,
            code: if self.config.output.include_code {
                block.source.clone()
            } else {
                String::new()
            },
        }
    }

    /// Scan a single local path (a directory or one `.tf` file).
    ///
    /// The repository name defaults to the directory name.
    ///
    /// # Errors
    ///
    /// Returns an error if the path doesn't exist, or if a file cannot be
    /// read and `continue_on_error` is disabled.
    pub async fn scan_path<P: AsRef<Path>>(&self, path: P, repository: Option<&str>) -> Result<ScanResult> {
        let path = path.as_ref();
        let repository = repository.map_or_else(|| repository_name(path), str::to_string);
        tracing::info!(path = %path.display(), repository = %repository, "Scanning path");

        let sources = self.parser.read_directory(path).await?;
        let mut result = self.analyze_sources(&repository, &sources.files);
        result.diagnostics.extend(
            sources
                .errors
                .iter()
                .filter_map(|e| e.to_diagnostic(&repository)),
        );
        Ok(result)
    }

    /// Scan multiple local paths, each as its own repository.
    ///
    /// # Errors
    ///
    /// Returns an error if any path fails to scan.
    pub async fn scan_paths<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ScanResult> {
        let mut merged = ScanResult::default();
        for path in paths {
            merged.merge(self.scan_path(path, None).await?);
        }
        Ok(merged)
    }

    /// Scan every repository listed in a file, one local path per line.
    ///
    /// Blank lines and lines starting with `#` are ignored. Relative paths
    /// are resolved against the list file's directory. A repository that
    /// cannot be scanned is skipped with a warning and recorded as a
    /// diagnostic, unless `continue_on_error` is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the list file cannot be read, or if a repository
    /// fails to scan and `continue_on_error` is disabled.
    pub async fn scan_list(&self, list_file: &Path) -> Result<ScanResult> {
        let content = tokio::fs::read_to_string(list_file)
            .await
            .map_err(|e| TfmiError::io(list_file, e, file!(), line!()))?;
        let base = list_file.parent().unwrap_or_else(|| Path::new("."));
        let repositories: Vec<PathBuf> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|l| base.join(l))
            .collect();

        tracing::info!(
            list = %list_file.display(),
            count = repositories.len(),
            "Scanning repository list"
        );

        let progress = ProgressBar::new(repositories.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            progress.set_style(style.progress_chars("#>-"));
        }

        let mut merged = ScanResult::default();
        let mut failed = 0;
        for path in &repositories {
            let name = repository_name(path);
            progress.set_message(format!("Scanning {name}"));

            match self.scan_path(path, Some(&name)).await {
                Ok(result) => merged.merge(result),
                Err(e) if self.config.scan.continue_on_error && e.is_recoverable() => {
                    tracing::warn!(repository = %name, error = %e, "Failed to scan repository, skipping");
                    merged.diagnostics.extend(e.to_diagnostic(&name));
                    failed += 1;
                }
                Err(e) => return Err(e),
            }
            progress.inc(1);
        }

        progress.finish_with_message(format!(
            "Scanned {} repositories ({} skipped)",
            repositories.len() - failed,
            failed
        ));
        Ok(merged)
    }
}

/// Directory name of a repository path (`.` resolves to the current directory's name).
fn repository_name(path: &Path) -> String {
    path.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .or_else(|| path.file_name())
        .map_or_else(
            || path.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        )
}
