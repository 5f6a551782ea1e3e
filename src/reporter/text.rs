//! Plain text report generator.

use crate::config::Config;
use crate::error::Result;
use crate::reporter::ReportGenerator;
use crate::types::{round2, BlockReport, DiagnosticKind, FileSummary, MiBand, ScanResult};
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

/// Text report generator for CLI output.
pub struct TextReporter {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to list every block instead of only the weak ones
    verbose: bool,
}

impl TextReporter {
    /// Create a new text reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            use_colors: config.output.colored,
            verbose: config.output.verbose,
        }
    }
}

impl ReportGenerator for TextReporter {
    fn generate(&self, result: &ScanResult) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header());
        output.push('\n');

        output.push_str(&self.format_summary(result));
        output.push('\n');

        if !result.files.is_empty() {
            output.push_str(&self.format_files(result));
            output.push('\n');
        }

        if !result.blocks.is_empty() {
            let blocks_output = self.format_blocks(result);
            if !blocks_output.is_empty() {
                output.push_str(&blocks_output);
                output.push('\n');
            }
        }

        if !result.diagnostics.is_empty() {
            output.push_str(&self.format_diagnostics(result));
            output.push('\n');
        }

        output.push_str(&self.format_footer(result));

        Ok(output)
    }
}

impl TextReporter {
    fn format_header(&self) -> String {
        let title = "tfmi Maintainability Report";
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

        if self.use_colors {
            format!(
                "\n{} {} {}\n{}\n",
                title.bright_white().bold(),
                version.dimmed(),
                format!("({timestamp})").dimmed(),
                "=".repeat(80).bright_blue(),
            )
        } else {
            format!("\n{title} {version} ({timestamp})\n{}\n", "=".repeat(80))
        }
    }

    fn section_title(&self, title: &str) -> String {
        let title = if self.use_colors {
            title.bright_cyan().bold().to_string()
        } else {
            title.to_string()
        };
        format!("\n{title}\n{}\n", "-".repeat(80))
    }

    fn format_summary(&self, result: &ScanResult) -> String {
        let mut output = self.section_title("Summary");

        let mean = result
            .mean_index()
            .map_or_else(|| "n/a".to_string(), |mi| format!("{:.2}", round2(mi)));
        let mean = match result.mean_index() {
            Some(mi) if self.use_colors => self.paint_band(&mean, MiBand::from_score(mi)),
            _ => mean,
        };

        output.push_str(&format!(
            "  {} repositories | {} files scanned | {} files scored | {} blocks\n",
            result.repositories.len(),
            result.files_scanned,
            result.files.len(),
            result.blocks.len()
        ));
        output.push_str(&format!("  Mean maintainability index: {mean}\n"));

        let counts: Vec<String> = [
            MiBand::Exceptional,
            MiBand::Good,
            MiBand::Moderate,
            MiBand::Poor,
        ]
        .into_iter()
        .map(|band| {
            let n = result.blocks.iter().filter(|b| b.scores.band() == band).count();
            format!("{n} {band}")
        })
        .collect();
        output.push_str(&format!("  {}\n", counts.join(" | ")));

        let parse_warnings = result.diagnostics_of(DiagnosticKind::Parse).count();
        let parse_line = format!(
            "{parse_warnings} parse {}",
            if parse_warnings == 1 { "warning" } else { "warnings" }
        );
        if self.use_colors && parse_warnings > 0 {
            output.push_str(&format!("  {}\n", parse_line.yellow()));
        } else {
            output.push_str(&format!("  {parse_line}\n"));
        }

        output
    }

    fn format_files(&self, result: &ScanResult) -> String {
        let mut output = self.section_title("Files");

        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["File", "Blocks", "Lines", "LOC", "MI", "Band"]);

        for file in &result.files {
            self.add_file_row(&mut table, file, result.repositories.len() > 1);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn add_file_row(&self, table: &mut Table, file: &FileSummary, show_repository: bool) {
        let path = get_contextual_path(&file.file_path, 3);
        let path = if show_repository {
            format!("{}/{path}", file.repository)
        } else {
            path
        };
        let band = MiBand::from_score(file.maintainability_index);

        table.add_row(vec![
            Cell::new(path),
            Cell::new(file.block_count),
            Cell::new(format!("{}-{}", file.start_line, file.end_line)),
            Cell::new(file.loc),
            self.band_cell(format!("{:.2}", round2(file.maintainability_index)), band),
            self.band_cell(band.to_string(), band),
        ]);
    }

    fn format_blocks(&self, result: &ScanResult) -> String {
        let weak: Vec<&BlockReport> = result
            .blocks
            .iter()
            .filter(|b| b.scores.band() <= MiBand::Moderate)
            .collect();

        if !self.verbose && weak.is_empty() {
            return String::new();
        }

        let mut output = self.section_title("Blocks");

        let passing = result.blocks.len() - weak.len();
        if !self.verbose && passing > 0 {
            let summary = format!("{} below Good, {passing} Good or better", weak.len());
            if self.use_colors {
                output.push_str(&format!(
                    "  {} (set output.verbose to show all)\n\n",
                    summary.dimmed()
                ));
            } else {
                output.push_str(&format!("  {summary} (set output.verbose to show all)\n\n"));
            }
        }

        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Block", "Type", "File", "Lines", "MI", "Band"]);

        if self.verbose {
            for block in &result.blocks {
                self.add_block_row(&mut table, block);
            }
        } else {
            for block in weak {
                self.add_block_row(&mut table, block);
            }
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn add_block_row(&self, table: &mut Table, block: &BlockReport) {
        let band = block.scores.band();
        table.add_row(vec![
            Cell::new(truncate(&block.block_name, 45)),
            Cell::new(&block.block_type),
            Cell::new(get_contextual_path(&block.id.file_path, 3)),
            Cell::new(format!("{}-{}", block.id.start_line, block.end_line)),
            self.band_cell(format!("{:.2}", round2(block.scores.maintainability_index)), band),
            self.band_cell(band.to_string(), band),
        ]);
    }

    fn format_diagnostics(&self, result: &ScanResult) -> String {
        let mut output = self.section_title("Diagnostics");

        for diagnostic in &result.diagnostics {
            let kind = format!("[{}]", diagnostic.kind);
            let kind = if self.use_colors {
                match diagnostic.kind {
                    DiagnosticKind::Parse | DiagnosticKind::Io => kind.yellow().to_string(),
                    DiagnosticKind::MetricDomain => kind.red().to_string(),
                    DiagnosticKind::EmptyScope | DiagnosticKind::StrictHcl => {
                        kind.blue().to_string()
                    }
                }
            } else {
                kind
            };

            let location = match (&diagnostic.file, diagnostic.line) {
                (Some(file), Some(line)) => format!(" {}:{line}", file.display()),
                (Some(file), None) => format!(" {}", file.display()),
                (None, _) => String::new(),
            };
            output.push_str(&format!(
                "  {kind} {}{location}: {}\n",
                diagnostic.repository, diagnostic.message
            ));
        }

        output
    }

    fn format_footer(&self, result: &ScanResult) -> String {
        let Some(mean) = result.mean_index() else {
            return "\nNo analyzable blocks found\n\n".to_string();
        };
        let band = MiBand::from_score(mean);
        let status = format!("Overall: {:.2} ({band})", round2(mean));
        format!("\n{}\n\n", self.paint_band(&status, band))
    }

    fn band_cell(&self, content: String, band: MiBand) -> Cell {
        let cell = Cell::new(content);
        if self.use_colors {
            cell.fg(band_color(band))
        } else {
            cell
        }
    }

    fn paint_band(&self, text: &str, band: MiBand) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match band {
            MiBand::Exceptional => text.green().bold().to_string(),
            MiBand::Good => text.green().to_string(),
            MiBand::Moderate => text.yellow().to_string(),
            MiBand::Poor => text.red().bold().to_string(),
        }
    }
}

fn band_color(band: MiBand) -> Color {
    match band {
        MiBand::Exceptional | MiBand::Good => Color::Green,
        MiBand::Moderate => Color::Yellow,
        MiBand::Poor => Color::Red,
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Last `depth` components of a path.
/// Example: env/prod/network/main.tf -> prod/network/main.tf
fn get_contextual_path(path: &std::path::Path, depth: usize) -> String {
    let components: Vec<_> = path.components().collect();
    let start_idx = components.len().saturating_sub(depth);

    components[start_idx..]
        .iter()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
