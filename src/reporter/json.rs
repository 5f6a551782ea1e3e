//! JSON report generator.

use crate::config::Config;
use crate::error::Result;
use crate::reporter::ReportGenerator;
use crate::types::{round2, BlockReport, Diagnostic, DiagnosticKind, FileSummary, MiBand, ScanResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// JSON report generator.
pub struct JsonReporter {
    /// Whether to pretty-print the output
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            pretty: config.output.pretty,
        }
    }
}

impl ReportGenerator for JsonReporter {
    fn generate(&self, result: &ScanResult) -> Result<String> {
        let report = JsonReport::from(result);

        let json = if self.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        };

        json.map_err(|e| crate::err!(ReportGeneration {
            message: format!("Failed to serialize JSON report: {e}"),
        }))
    }
}

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    /// Report metadata
    pub metadata: ReportMetadata,
    /// Summary statistics
    pub summary: ReportSummary,
    /// Per-file summaries
    pub files: Vec<JsonFile>,
    /// Per-block results
    pub blocks: Vec<JsonBlock>,
    /// Non-fatal problems
    pub diagnostics: Vec<Diagnostic>,
}

impl From<&ScanResult> for JsonReport {
    fn from(result: &ScanResult) -> Self {
        let mut bands: BTreeMap<String, usize> = [
            MiBand::Exceptional,
            MiBand::Good,
            MiBand::Moderate,
            MiBand::Poor,
        ]
        .iter()
        .map(|b| (b.to_string(), 0))
        .collect();
        for block in &result.blocks {
            *bands.entry(block.scores.band().to_string()).or_default() += 1;
        }

        let mut diagnostics_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for diagnostic in &result.diagnostics {
            *diagnostics_by_kind
                .entry(diagnostic.kind.to_string())
                .or_default() += 1;
        }

        Self {
            metadata: ReportMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                repositories: result.repositories.clone(),
                files_scanned: result.files_scanned,
            },
            summary: ReportSummary {
                total_files: result.files.len(),
                total_blocks: result.blocks.len(),
                mean_maintainability_index: result.mean_index().map(round2),
                blocks_by_band: bands,
                parse_warnings: result.diagnostics_of(DiagnosticKind::Parse).count(),
                diagnostics_by_kind,
            },
            files: result.files.iter().map(JsonFile::from).collect(),
            blocks: result.blocks.iter().map(JsonBlock::from).collect(),
            diagnostics: result.diagnostics.clone(),
        }
    }
}

/// Report metadata.
#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    /// tfmi version
    pub version: String,
    /// Report generation timestamp
    pub timestamp: String,
    /// Repositories analyzed
    pub repositories: Vec<String>,
    /// Number of files scanned
    pub files_scanned: usize,
}

/// Report summary.
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    /// Files with at least one scored block
    pub total_files: usize,
    /// Scored blocks
    pub total_blocks: usize,
    /// Mean index over all blocks
    pub mean_maintainability_index: Option<f64>,
    /// Block count per band
    pub blocks_by_band: BTreeMap<String, usize>,
    /// Declarations skipped by the extractor
    pub parse_warnings: usize,
    /// Diagnostic count per kind
    pub diagnostics_by_kind: BTreeMap<String, usize>,
}

/// JSON representation of a file summary.
#[derive(Debug, Serialize)]
pub struct JsonFile {
    pub repository: String,
    pub file_path: String,
    pub block_count: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub loc: usize,
    pub maintainability_index: f64,
    pub band: String,
}

impl From<&FileSummary> for JsonFile {
    fn from(file: &FileSummary) -> Self {
        Self {
            repository: file.repository.clone(),
            file_path: file.file_path.to_string_lossy().to_string(),
            block_count: file.block_count,
            start_line: file.start_line,
            end_line: file.end_line,
            loc: file.loc,
            maintainability_index: round2(file.maintainability_index),
            band: MiBand::from_score(file.maintainability_index).to_string(),
        }
    }
}

/// JSON representation of a scored block.
#[derive(Debug, Serialize)]
pub struct JsonBlock {
    /// Repository (scope)
    pub repository: String,
    /// File path relative to the repository root
    pub file_path: String,
    /// Block type as written
    pub block_type: String,
    /// Human-readable name
    pub block_name: String,
    /// `kind:type_label:name`
    pub id: String,
    pub start_line: usize,
    pub end_line: usize,
    pub loc: usize,
    /// Final index, two decimals
    pub maintainability_index: f64,
    /// Band of the index
    pub band: String,
    /// Category scores, two decimals
    pub categories: BTreeMap<String, f64>,
    /// Raw metrics (`null` when undefined)
    pub metrics: BTreeMap<String, Option<f64>>,
    /// Sub-scores, two decimals
    pub sub_scores: BTreeMap<String, f64>,
    /// Block source, when requested
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
}

impl From<&BlockReport> for JsonBlock {
    fn from(block: &BlockReport) -> Self {
        Self {
            repository: block.repository.clone(),
            file_path: block.id.file_path.to_string_lossy().to_string(),
            block_type: block.block_type.clone(),
            block_name: block.block_name.clone(),
            id: format!("{}:{}:{}", block.id.kind, block.id.type_label, block.id.name),
            start_line: block.id.start_line,
            end_line: block.end_line,
            loc: block.loc,
            maintainability_index: round2(block.scores.maintainability_index),
            band: block.scores.band().to_string(),
            categories: block
                .scores
                .categories
                .iter()
                .map(|(c, v)| (c.to_string(), round2(*v)))
                .collect(),
            metrics: block
                .metrics
                .to_map()
                .into_iter()
                .map(|(m, v)| (m.to_string(), v))
                .collect(),
            sub_scores: block
                .scores
                .sub_scores
                .iter()
                .map(|(m, v)| (m.to_string(), round2(*v)))
                .collect(),
            code: block.code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::test_support::sample_result;
    use pretty_assertions::assert_eq;

    fn generate(result: &ScanResult) -> serde_json::Value {
        let json = JsonReporter::new(&Config::default()).generate(result).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_json_report_generation() {
        let result = sample_result(false);
        let value = generate(&result);

        assert_eq!(value["metadata"]["files_scanned"], 2);
        assert_eq!(value["metadata"]["repositories"][0], "infra");
        assert_eq!(value["summary"]["total_blocks"], 3);
        assert_eq!(value["summary"]["total_files"], 1);
        assert_eq!(value["summary"]["parse_warnings"], 1);
        assert_eq!(value["blocks"].as_array().unwrap().len(), 3);
        assert_eq!(value["files"][0]["file_path"], "main.tf");
    }

    #[test]
    fn test_band_counts_cover_every_block() {
        let value = generate(&sample_result(false));
        let bands = value["summary"]["blocks_by_band"].as_object().unwrap();
        assert_eq!(bands.len(), 4);
        let total: u64 = bands.values().map(|v| v.as_u64().unwrap()).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_block_fields() {
        let value = generate(&sample_result(false));
        let web = &value["blocks"][0];
        assert_eq!(web["block_name"], "aws_instance.web");
        assert_eq!(web["id"], "resource:aws_instance:web");
        assert_eq!(web["start_line"], 1);
        assert_eq!(web["end_line"], 5);
        assert_eq!(web["metrics"]["coupling"], 1.0);
        assert_eq!(web["categories"].as_object().unwrap().len(), 5);
        assert_eq!(web["sub_scores"].as_object().unwrap().len(), 14);
        assert!(web.get("code").is_none());

        let mi = web["maintainability_index"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&mi));
        assert_eq!(mi, round2(mi));
    }

    #[test]
    fn test_undefined_metric_is_null() {
        let value = generate(&sample_result(false));
        // two resources, no data sources: data_source_ratio is defined (0)
        assert_eq!(value["blocks"][0]["metrics"]["data_source_ratio"], 0.0);
        assert!(value["blocks"][0]["metrics"]["output_ratio"].is_number());

        let empty = generate(&ScanResult::default());
        assert!(empty["summary"]["mean_maintainability_index"].is_null());
    }

    #[test]
    fn test_compact_output() {
        let mut config = Config::default();
        config.output.pretty = false;
        let json = JsonReporter::new(&config)
            .generate(&sample_result(false))
            .unwrap();
        assert!(!json.contains('\n'));
    }
}
