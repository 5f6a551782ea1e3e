//! Core data types used throughout tfmi.
//!
//! This module defines the fundamental data structures for representing:
//! - Configuration blocks and their attributes
//! - Raw metric vectors and score vectors
//! - Per-block and per-file results
//! - Diagnostics and report formats

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::PathBuf;

/// The kind of a configuration block.
///
/// Top-level keywords outside the known set (`provider`, `terraform`,
/// `moved`, ...) and every nested block map to [`BlockKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// `resource "type" "name" { ... }`
    Resource,
    /// `module "name" { ... }`
    Module,
    /// `variable "name" { ... }`
    Variable,
    /// `output "name" { ... }`
    Output,
    /// `data "type" "name" { ... }`
    Data,
    /// `locals { ... }`
    Local,
    /// Anything else
    Other,
}

impl BlockKind {
    /// Map a top-level block keyword to its kind.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "resource" => Self::Resource,
            "module" => Self::Module,
            "variable" => Self::Variable,
            "output" => Self::Output,
            "data" => Self::Data,
            "locals" => Self::Local,
            _ => Self::Other,
        }
    }

    /// Lowercase name used in block identifiers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Module => "module",
            Self::Variable => "variable",
            Self::Output => "output",
            Self::Data => "data",
            Self::Local => "local",
            Self::Other => "other",
        }
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about an attribute value gathered while classifying it.
///
/// These feed the metric calculators; they are computed once, when the
/// attribute is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionFacts {
    /// Names of called functions, in order of appearance
    pub function_calls: Vec<String>,
    /// Literal text of every string (quoted or heredoc), interpolations removed
    pub string_literals: Vec<String>,
    /// Number of `var.*` reference occurrences
    pub variable_refs: usize,
    /// Ternary operators and `%{if}` directives
    pub conditionals: usize,
    /// `for` expressions and `%{for}` directives
    pub for_expressions: usize,
}

/// A single key-value pair inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute key
    pub name: String,
    /// Value text exactly as written (trimmed)
    pub raw_value_text: String,
    /// True when the value has no reference, interpolation, function call or operator
    pub is_hard_coded: bool,
    /// True when at least one tracked reference appears in the value
    pub is_reference: bool,
    /// Referenced addresses (`var.x`, `module.m.out`, `data.t.n`, `t.n`, ...)
    pub referenced_identifiers: BTreeSet<String>,
    /// 1-based line of the attribute key
    pub line: usize,
    /// Classifier facts for the metric calculators
    pub expression: ExpressionFacts,
}

/// One configuration unit.
///
/// Blocks are created once per parse pass over a file and are not mutated
/// afterwards. Nested blocks (`dynamic`, `provisioner`, `lifecycle`, ...) are
/// owned by their parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block kind
    pub kind: BlockKind,
    /// Type label (`aws_instance`), keyword for `Other`, empty for variable/output/local/module
    pub type_label: String,
    /// Block name
    pub name: String,
    /// Direct attributes, in source order
    pub attributes: Vec<Attribute>,
    /// Direct nested blocks, in source order
    pub nested_blocks: Vec<Block>,
    /// 1-based line of the block header
    pub start_line: usize,
    /// 1-based line of the closing brace
    pub end_line: usize,
    /// `end_line - start_line + 1`
    pub line_count: usize,
    /// 0 without nested blocks, otherwise 1 + the deepest child's depth
    pub max_nesting_depth: usize,
    /// Source text from the header to the closing brace
    pub source: String,
}

impl Block {
    /// Identifier in the form `kind:type_label:name`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.kind, self.type_label, self.name)
    }

    /// Block type as written in source (`resource`, `locals`, `provider`, ...).
    #[must_use]
    pub fn keyword(&self) -> &str {
        match self.kind {
            BlockKind::Resource => "resource",
            BlockKind::Module => "module",
            BlockKind::Variable => "variable",
            BlockKind::Output => "output",
            BlockKind::Data => "data",
            BlockKind::Local => "locals",
            BlockKind::Other => &self.type_label,
        }
    }

    /// Human-readable name (`aws_instance.web`, `vpc`, `locals`).
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.kind {
            BlockKind::Resource | BlockKind::Data => format!("{}.{}", self.type_label, self.name),
            BlockKind::Module | BlockKind::Variable | BlockKind::Output | BlockKind::Local => {
                self.name.clone()
            }
            BlockKind::Other => {
                if self.name.is_empty() {
                    self.type_label.clone()
                } else {
                    self.name.clone()
                }
            }
        }
    }

    /// Visit every attribute in this block and its nested blocks.
    ///
    /// The callback receives the block that owns the attribute.
    pub fn for_each_attribute<'a>(&'a self, f: &mut impl FnMut(&'a Block, &'a Attribute)) {
        for attribute in &self.attributes {
            f(self, attribute);
        }
        for nested in &self.nested_blocks {
            nested.for_each_attribute(f);
        }
    }

    /// Number of attributes in the block tree.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
            + self
                .nested_blocks
                .iter()
                .map(Block::attribute_count)
                .sum::<usize>()
    }
}

/// External key of a block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId {
    /// File path relative to the repository root
    pub file_path: PathBuf,
    /// Block kind
    pub kind: BlockKind,
    /// Type label
    pub type_label: String,
    /// Block name
    pub name: String,
    /// 1-based start line
    pub start_line: usize,
}

impl Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.file_path.display(),
            self.kind,
            self.type_label,
            self.name,
            self.start_line
        )
    }
}

/// Score categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Module ratio, block size, parameterization
    ModuleQuality,
    /// Hard-coding, attribute density, nesting
    ConfigurationFidelity,
    /// Complexity, coupling, reference depth
    GraphComplexity,
    /// Deprecated functions, wildcards, dynamism
    QualityCompliance,
    /// Outputs and data sources
    IntegrationReadiness,
}

impl Category {
    /// All categories in report order.
    pub const ALL: [Self; 5] = [
        Self::ModuleQuality,
        Self::ConfigurationFidelity,
        Self::GraphComplexity,
        Self::QualityCompliance,
        Self::IntegrationReadiness,
    ];

    /// Column / key name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModuleQuality => "module_quality",
            Self::ConfigurationFidelity => "configuration_fidelity",
            Self::GraphComplexity => "graph_complexity",
            Self::QualityCompliance => "quality_compliance",
            Self::IntegrationReadiness => "integration_readiness",
        }
    }

    /// The sub-metrics that make up this category.
    #[must_use]
    pub fn metrics(&self) -> &'static [SubMetric] {
        match self {
            Self::ModuleQuality => &[
                SubMetric::ModuleRatio,
                SubMetric::BlockLoc,
                SubMetric::VariableRatio,
            ],
            Self::ConfigurationFidelity => &[
                SubMetric::HardCodedRatio,
                SubMetric::AttributeCount,
                SubMetric::NestingDepth,
            ],
            Self::GraphComplexity => &[
                SubMetric::CyclomaticComplexity,
                SubMetric::Coupling,
                SubMetric::GraphDepth,
            ],
            Self::QualityCompliance => &[
                SubMetric::DeprecatedFunctions,
                SubMetric::WildcardUsage,
                SubMetric::DynamicConstructs,
            ],
            Self::IntegrationReadiness => &[SubMetric::OutputRatio, SubMetric::DataSourceRatio],
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw sub-metrics, grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubMetric {
    /// modules / (resources + modules) in scope
    ModuleRatio,
    /// Block line count
    BlockLoc,
    /// `var.*` references per attribute
    VariableRatio,
    /// Hard-coded attributes / attributes
    HardCodedRatio,
    /// Attributes in the block tree
    AttributeCount,
    /// Nested block depth
    NestingDepth,
    /// 1 + branching constructs
    CyclomaticComplexity,
    /// Out-degree in the reference graph
    Coupling,
    /// Longest acyclic reference chain
    GraphDepth,
    /// Deprecated function calls
    DeprecatedFunctions,
    /// Wildcard string literals
    WildcardUsage,
    /// Loops and conditionals
    DynamicConstructs,
    /// outputs / resources in scope
    OutputRatio,
    /// data / (resources + data) in scope
    DataSourceRatio,
}

impl SubMetric {
    /// All sub-metrics in report order.
    pub const ALL: [Self; 14] = [
        Self::ModuleRatio,
        Self::BlockLoc,
        Self::VariableRatio,
        Self::HardCodedRatio,
        Self::AttributeCount,
        Self::NestingDepth,
        Self::CyclomaticComplexity,
        Self::Coupling,
        Self::GraphDepth,
        Self::DeprecatedFunctions,
        Self::WildcardUsage,
        Self::DynamicConstructs,
        Self::OutputRatio,
        Self::DataSourceRatio,
    ];

    /// Column / key name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModuleRatio => "module_ratio",
            Self::BlockLoc => "block_loc",
            Self::VariableRatio => "variable_ratio",
            Self::HardCodedRatio => "hard_coded_ratio",
            Self::AttributeCount => "attribute_count",
            Self::NestingDepth => "nesting_depth",
            Self::CyclomaticComplexity => "cyclomatic_complexity",
            Self::Coupling => "coupling",
            Self::GraphDepth => "graph_depth",
            Self::DeprecatedFunctions => "deprecated_functions",
            Self::WildcardUsage => "wildcard_usage",
            Self::DynamicConstructs => "dynamic_constructs",
            Self::OutputRatio => "output_ratio",
            Self::DataSourceRatio => "data_source_ratio",
        }
    }

    /// The category this sub-metric belongs to.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::ModuleRatio | Self::BlockLoc | Self::VariableRatio => Category::ModuleQuality,
            Self::HardCodedRatio | Self::AttributeCount | Self::NestingDepth => {
                Category::ConfigurationFidelity
            }
            Self::CyclomaticComplexity | Self::Coupling | Self::GraphDepth => {
                Category::GraphComplexity
            }
            Self::DeprecatedFunctions | Self::WildcardUsage | Self::DynamicConstructs => {
                Category::QualityCompliance
            }
            Self::OutputRatio | Self::DataSourceRatio => Category::IntegrationReadiness,
        }
    }

    /// Inclusive domain of the raw value. Every metric is non-negative; share
    /// ratios are additionally capped at 1.
    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        match self {
            Self::ModuleRatio | Self::HardCodedRatio | Self::DataSourceRatio => (0.0, 1.0),
            Self::CyclomaticComplexity | Self::BlockLoc => (1.0, f64::INFINITY),
            Self::VariableRatio
            | Self::AttributeCount
            | Self::NestingDepth
            | Self::Coupling
            | Self::GraphDepth
            | Self::DeprecatedFunctions
            | Self::WildcardUsage
            | Self::DynamicConstructs
            | Self::OutputRatio => (0.0, f64::INFINITY),
        }
    }
}

impl Display for SubMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw metric values for one block.
///
/// Ratio metrics are `None` when undefined (zero denominator, or the metric
/// does not apply to the block kind); the scoring engine maps `None` to the
/// metric's neutral score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricVector {
    pub module_ratio: Option<f64>,
    pub block_loc: f64,
    pub variable_ratio: Option<f64>,
    pub hard_coded_ratio: Option<f64>,
    pub attribute_count: f64,
    pub nesting_depth: f64,
    pub cyclomatic_complexity: f64,
    pub coupling: f64,
    pub graph_depth: f64,
    pub deprecated_functions: f64,
    pub wildcard_usage: f64,
    pub dynamic_constructs: f64,
    pub output_ratio: Option<f64>,
    pub data_source_ratio: Option<f64>,
}

impl MetricVector {
    /// Raw value of one sub-metric.
    #[must_use]
    pub fn get(&self, metric: SubMetric) -> Option<f64> {
        match metric {
            SubMetric::ModuleRatio => self.module_ratio,
            SubMetric::BlockLoc => Some(self.block_loc),
            SubMetric::VariableRatio => self.variable_ratio,
            SubMetric::HardCodedRatio => self.hard_coded_ratio,
            SubMetric::AttributeCount => Some(self.attribute_count),
            SubMetric::NestingDepth => Some(self.nesting_depth),
            SubMetric::CyclomaticComplexity => Some(self.cyclomatic_complexity),
            SubMetric::Coupling => Some(self.coupling),
            SubMetric::GraphDepth => Some(self.graph_depth),
            SubMetric::DeprecatedFunctions => Some(self.deprecated_functions),
            SubMetric::WildcardUsage => Some(self.wildcard_usage),
            SubMetric::DynamicConstructs => Some(self.dynamic_constructs),
            SubMetric::OutputRatio => self.output_ratio,
            SubMetric::DataSourceRatio => self.data_source_ratio,
        }
    }

    /// All values keyed by sub-metric.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<SubMetric, Option<f64>> {
        SubMetric::ALL.iter().map(|m| (*m, self.get(*m))).collect()
    }
}

/// Bounded scores for one block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    /// Sub-score per sub-metric, each within `[0, curve max]`
    pub sub_scores: BTreeMap<SubMetric, f64>,
    /// Weighted category scores
    pub categories: BTreeMap<Category, f64>,
    /// Final index, clamped to `[0, 100]`
    pub maintainability_index: f64,
}

impl ScoreVector {
    /// Sub-score of one metric (0 if absent).
    #[must_use]
    pub fn sub_score(&self, metric: SubMetric) -> f64 {
        self.sub_scores.get(&metric).copied().unwrap_or_default()
    }

    /// Score of one category (0 if absent).
    #[must_use]
    pub fn category(&self, category: Category) -> f64 {
        self.categories.get(&category).copied().unwrap_or_default()
    }

    /// Qualitative band of the index.
    #[must_use]
    pub fn band(&self) -> MiBand {
        MiBand::from_score(self.maintainability_index)
    }
}

/// Qualitative band of a maintainability index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MiBand {
    /// Below 50
    Poor,
    /// 50 to 70
    Moderate,
    /// 70 to 85
    Good,
    /// 85 and above
    Exceptional,
}

impl MiBand {
    /// Band for a score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Self::Exceptional
        } else if score >= 70.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Moderate
        } else {
            Self::Poor
        }
    }
}

impl Display for MiBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poor => write!(f, "Poor"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Good => write!(f, "Good"),
            Self::Exceptional => write!(f, "Exceptional"),
        }
    }
}

/// Round to two decimals for external reporting.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Result for one analyzed block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReport {
    /// Repository (scope) the block belongs to
    pub repository: String,
    /// Block key
    pub id: BlockId,
    /// Human-readable name
    pub block_name: String,
    /// Block type as written (`resource`, `locals`, `provider`, ...)
    pub block_type: String,
    /// 1-based end line
    pub end_line: usize,
    /// Line count
    pub loc: usize,
    /// Raw metrics
    pub metrics: MetricVector,
    /// Scores
    pub scores: ScoreVector,
    /// Block source text
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub code: String,
}

/// Aggregate over the blocks of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Repository (scope) the file belongs to
    pub repository: String,
    /// File path relative to the repository root
    pub file_path: PathBuf,
    /// Number of scored blocks
    pub block_count: usize,
    /// Smallest block start line
    pub start_line: usize,
    /// Largest block end line
    pub end_line: usize,
    /// Sum of block line counts
    pub loc: usize,
    /// Arithmetic mean of block indices
    pub maintainability_index: f64,
}

/// Category of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Declaration skipped because of unbalanced or unrecognized syntax
    Parse,
    /// File or repository without analyzable blocks
    EmptyScope,
    /// Raw metric clamped into its domain
    MetricDomain,
    /// Strict HCL parser rejected the file
    StrictHcl,
    /// File could not be read
    Io,
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::EmptyScope => write!(f, "empty-scope"),
            Self::MetricDomain => write!(f, "metric-domain"),
            Self::StrictHcl => write!(f, "strict-hcl"),
            Self::Io => write!(f, "io"),
        }
    }
}

/// A non-fatal problem recorded during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Category
    pub kind: DiagnosticKind,
    /// Repository (scope)
    pub repository: String,
    /// File, when the problem is file-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Line, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Message
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(file) = &self.file {
            write!(f, " {}", file.display())?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
            }
        }
        write!(f, " {}", self.message)
    }
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// CSV dataset, one row per block plus one summary row per file
    Csv,
}

/// How blocks are grouped for scope-level ratios and reference resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScopeMode {
    /// Each file is its own scope
    #[default]
    File,
    /// All files of a repository share one scope
    Repository,
}

/// Result of analyzing one or more repositories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Repositories analyzed, in input order
    pub repositories: Vec<String>,
    /// Number of files analyzed
    pub files_scanned: usize,
    /// Per-block results, in file then source order
    pub blocks: Vec<BlockReport>,
    /// Per-file summaries (files without blocks have none)
    pub files: Vec<FileSummary>,
    /// Non-fatal problems
    pub diagnostics: Vec<Diagnostic>,
}

impl ScanResult {
    /// Merge another scan result into this one.
    pub fn merge(&mut self, other: Self) {
        self.repositories.extend(other.repositories);
        self.files_scanned += other.files_scanned;
        self.blocks.extend(other.blocks);
        self.files.extend(other.files);
        self.diagnostics.extend(other.diagnostics);
    }

    /// Mean index over all blocks, if any.
    #[must_use]
    pub fn mean_index(&self) -> Option<f64> {
        if self.blocks.is_empty() {
            return None;
        }
        let total: f64 = self
            .blocks
            .iter()
            .map(|b| b.scores.maintainability_index)
            .sum();
        Some(total / self.blocks.len() as f64)
    }

    /// Find a block by display name (`aws_instance.web`).
    #[must_use]
    pub fn find_block(&self, display_name: &str) -> Option<&BlockReport> {
        self.blocks.iter().find(|b| b.block_name == display_name)
    }

    /// Summary for a file, if one was produced.
    #[must_use]
    pub fn file_summary(&self, file: &std::path::Path) -> Option<&FileSummary> {
        self.files.iter().find(|f| f.file_path == file)
    }

    /// Diagnostics of one kind.
    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kind_from_keyword() {
        assert_eq!(BlockKind::from_keyword("resource"), BlockKind::Resource);
        assert_eq!(BlockKind::from_keyword("locals"), BlockKind::Local);
        assert_eq!(BlockKind::from_keyword("provider"), BlockKind::Other);
        assert_eq!(BlockKind::Local.as_str(), "local");
    }

    #[test]
    fn test_category_metrics_cover_every_sub_metric_once() {
        let mut seen: Vec<SubMetric> = Category::ALL
            .iter()
            .flat_map(|c| c.metrics().iter().copied())
            .collect();
        seen.sort();
        let mut all = SubMetric::ALL.to_vec();
        all.sort();
        assert_eq!(seen, all);
        for metric in SubMetric::ALL {
            assert!(metric.category().metrics().contains(&metric));
        }
    }

    #[test]
    fn test_mi_band() {
        assert_eq!(MiBand::from_score(92.0), MiBand::Exceptional);
        assert_eq!(MiBand::from_score(70.0), MiBand::Good);
        assert_eq!(MiBand::from_score(55.5), MiBand::Moderate);
        assert_eq!(MiBand::from_score(12.0), MiBand::Poor);
    }

    #[test]
    fn test_round2() {
        assert!((round2(80.6875) - 80.69).abs() < 1e-12);
        assert!((round2(33.333_333) - 33.33).abs() < 1e-12);
    }

    #[test]
    fn test_metric_vector_lookup() {
        let metrics = MetricVector {
            block_loc: 25.0,
            coupling: 2.0,
            output_ratio: None,
            ..MetricVector::default()
        };
        assert_eq!(metrics.get(SubMetric::BlockLoc), Some(25.0));
        assert_eq!(metrics.get(SubMetric::Coupling), Some(2.0));
        assert_eq!(metrics.get(SubMetric::OutputRatio), None);
        assert_eq!(metrics.to_map().len(), 14);
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            kind: DiagnosticKind::Parse,
            repository: "repo".to_string(),
            file: Some(PathBuf::from("main.tf")),
            line: Some(4),
            message: "unbalanced braces".to_string(),
        };
        assert_eq!(d.to_string(), "[parse] main.tf:4 unbalanced braces");
    }
}
