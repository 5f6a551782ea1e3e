//! CSV dataset generator.
//!
//! One row per block, followed after each file's blocks by a
//! `FILE_SUMMARY` row carrying the file's mean index.

use crate::config::Config;
use crate::error::Result;
use crate::reporter::ReportGenerator;
use crate::types::{round2, BlockReport, Category, FileSummary, ScanResult, SubMetric};
use std::sync::LazyLock;

/// `block_type` of per-file summary rows.
pub const FILE_SUMMARY_TYPE: &str = "FILE_SUMMARY";

/// Column names, in output order.
pub static CSV_COLUMNS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    let mut columns = vec![
        "repository",
        "file_path",
        "block_type",
        "block_name",
        "start_line",
        "end_line",
        "loc",
    ];
    columns.extend(SubMetric::ALL.iter().map(SubMetric::as_str));
    columns.extend(Category::ALL.iter().map(Category::as_str));
    columns.push("maintainability_index");
    columns.push("code");
    columns
});

/// CSV report generator.
pub struct CsvReporter {
    include_code: bool,
}

impl CsvReporter {
    /// Create a new CSV reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            include_code: config.output.include_code,
        }
    }

    fn block_row(&self, block: &BlockReport) -> Vec<String> {
        let mut row = vec![
            block.repository.clone(),
            block.id.file_path.display().to_string(),
            block.block_type.clone(),
            block.block_name.clone(),
            block.id.start_line.to_string(),
            block.end_line.to_string(),
            block.loc.to_string(),
        ];
        row.extend(
            SubMetric::ALL
                .iter()
                .map(|m| block.metrics.get(*m).map(format_number).unwrap_or_default()),
        );
        row.extend(
            Category::ALL
                .iter()
                .map(|c| format_number(round2(block.scores.category(*c)))),
        );
        row.push(format_number(round2(block.scores.maintainability_index)));
        row.push(if self.include_code {
            escape_code(&block.code)
        } else {
            String::new()
        });
        row
    }
}

impl ReportGenerator for CsvReporter {
    fn generate(&self, result: &ScanResult) -> Result<String> {
        let mut writer = ::csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_COLUMNS.iter())?;

        for file in &result.files {
            for block in result
                .blocks
                .iter()
                .filter(|b| b.repository == file.repository && b.id.file_path == file.file_path)
            {
                writer.write_record(self.block_row(block))?;
            }
            writer.write_record(summary_row(file))?;
        }

        let bytes = writer.into_inner().map_err(|e| {
            crate::err!(ReportGeneration {
                message: format!("Failed to flush CSV report: {e}"),
            })
        })?;
        String::from_utf8(bytes).map_err(|e| {
            crate::err!(ReportGeneration {
                message: format!("CSV report is not valid UTF-8: {e}"),
            })
        })
    }
}

fn summary_row(file: &FileSummary) -> Vec<String> {
    let mut row = vec![
        file.repository.clone(),
        file.file_path.display().to_string(),
        FILE_SUMMARY_TYPE.to_string(),
        format!("{} blocks", file.block_count),
        file.start_line.to_string(),
        file.end_line.to_string(),
        file.loc.to_string(),
    ];
    row.extend(std::iter::repeat_n(
        String::new(),
        SubMetric::ALL.len() + Category::ALL.len(),
    ));
    row.push(format_number(round2(file.maintainability_index)));
    row.push(String::new());
    row
}

/// Integers without a fractional part, everything else as shortest float.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Keep each row on one physical line.
fn escape_code(code: &str) -> String {
    code.replace("\r\n", "\\n").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::test_support::sample_result;
    use pretty_assertions::assert_eq;

    fn records(csv: &str) -> Vec<::csv::StringRecord> {
        ::csv::Reader::from_reader(csv.as_bytes())
            .records()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    fn reporter(include_code: bool) -> CsvReporter {
        let mut config = Config::default();
        config.output.include_code = include_code;
        CsvReporter::new(&config)
    }

    #[test]
    fn test_header_columns() {
        let csv = reporter(false).generate(&ScanResult::default()).unwrap();
        let header = csv.lines().next().unwrap();
        let columns: Vec<_> = header.split(',').collect();
        assert_eq!(columns.len(), 7 + 14 + 5 + 2);
        assert_eq!(columns[0], "repository");
        assert_eq!(columns[7], "module_ratio");
        assert_eq!(columns[21], "module_quality");
        assert_eq!(columns[26], "maintainability_index");
        assert_eq!(columns[27], "code");
    }

    #[test]
    fn test_block_rows_then_file_summary() {
        let result = sample_result(false);
        let csv = reporter(false).generate(&result).unwrap();
        let rows = records(&csv);

        // 3 blocks in main.tf + its summary; broken.tf has no blocks
        assert_eq!(rows.len(), 4);
        assert_eq!(&rows[0][2], "resource");
        assert_eq!(&rows[0][3], "aws_instance.web");
        assert_eq!(&rows[2][2], "output");

        let summary = &rows[3];
        assert_eq!(&summary[1], "main.tf");
        assert_eq!(&summary[2], FILE_SUMMARY_TYPE);
        assert_eq!(&summary[3], "3 blocks");
        assert_eq!(&summary[4], "1");
        assert_eq!(&summary[5], "13");
        assert!(summary.iter().skip(7).take(19).all(str::is_empty));

        let expected = round2(result.files[0].maintainability_index);
        let written: f64 = summary[26].parse().unwrap();
        assert!((written - expected).abs() < 1e-9);
    }

    #[test]
    fn test_raw_metric_columns() {
        let result = sample_result(false);
        let csv = reporter(false).generate(&result).unwrap();
        let rows = records(&csv);
        // module_ratio 0 / 2
        assert_eq!(&rows[0][7], "0");
        assert_eq!(&rows[0][8], "5");
        // output block: no var refs over one attribute
        assert_eq!(&rows[2][9], "0");
    }

    #[test]
    fn test_undefined_ratio_is_empty() {
        let result = crate::Scanner::new(Config::default()).unwrap().analyze_sources(
            "repo",
            &[(std::path::PathBuf::from("vars.tf"), "variable \"a\" {}\n".to_string())]
                .into_iter()
                .collect(),
        );
        let csv = reporter(false).generate(&result).unwrap();
        let rows = records(&csv);
        assert!(rows[0][7].is_empty());
        assert!(rows[0][9].is_empty());
        assert!(!rows[0][26].is_empty());
    }

    #[test]
    fn test_code_column_escapes_newlines() {
        let result = sample_result(true);
        let csv = reporter(true).generate(&result).unwrap();
        let rows = records(&csv);
        let code = &rows[1][27];
        assert_eq!(code, "resource \"aws_subnet\" \"a\" {\\n  cidr_block = \"10.0.1.0/24\"\\n}");
        assert!(rows[3][27].is_empty());
    }

    #[test]
    fn test_code_column_empty_unless_requested() {
        let result = sample_result(true);
        let csv = reporter(false).generate(&result).unwrap();
        assert!(records(&csv).iter().all(|r| r[27].is_empty()));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(80.69), "80.69");
        assert_eq!(format_number(0.5), "0.5");
    }
}
