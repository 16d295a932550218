/*!
 * Reporting functionality for treedoc
 *
 * Renders the statistics of a generation run, and any per-entry errors it
 * collected, as console tables using the tabled library.
 */

use tabled::{
    settings::{object::Columns, Alignment, Modify, Padding, Style},
    Table, Tabled,
};

use crate::generator::GenerationSummary;
use crate::types::PipelineError;
use crate::utils::truncate_for_display;

/// Errors listed individually before the table is cut off
const MAX_LISTED_ERRORS: usize = 10;

/// Width limit of the path column
const MAX_PATH_WIDTH: usize = 60;

/// Format of the report output
pub enum ReportFormat {
    /// Console table output
    ConsoleTable,
}

/// Report generator for generation runs
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    /// Create a new reporter
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    /// Format a number with human-readable units
    fn format_number(&self, num: usize) -> String {
        if num >= 1_000_000 {
            format!("{:.1}M", num as f64 / 1_000_000.0)
        } else if num >= 1_000 {
            format!("{:.1}K", num as f64 / 1_000.0)
        } else {
            num.to_string()
        }
    }

    /// Generate a report string for a finished run
    pub fn generate_report(&self, summary: &GenerationSummary) -> String {
        match self.format {
            ReportFormat::ConsoleTable => self.generate_console_report(summary),
        }
    }

    /// Print the report to stdout
    pub fn print_report(&self, summary: &GenerationSummary) {
        println!("\n{}", self.generate_report(summary));
    }

    fn style(table: &mut Table) -> String {
        table
            .with(Style::rounded())
            .with(Padding::new(1, 1, 0, 0))
            .with(Modify::new(Columns::new(..)).with(Alignment::left()));
        table.to_string()
    }

    fn create_summary_table(&self, summary: &GenerationSummary) -> String {
        #[derive(Tabled)]
        struct SummaryRow {
            #[tabled(rename = "Metric")]
            key: &'static str,

            #[tabled(rename = "Value")]
            value: String,
        }

        let rows = vec![
            SummaryRow {
                key: "Output File",
                value: summary.output_file.display().to_string(),
            },
            SummaryRow {
                key: "Process Time",
                value: format!("{:.4?}", summary.duration),
            },
            SummaryRow {
                key: "Files Rendered",
                value: format!(
                    "{} of {}",
                    self.format_number(summary.files_rendered),
                    self.format_number(summary.files_total as usize)
                ),
            },
            SummaryRow {
                key: "Files Skipped",
                value: self.format_number(summary.files_skipped),
            },
            SummaryRow {
                key: "Tree Entries",
                value: self.format_number(summary.tree_entries),
            },
            SummaryRow {
                key: "Pages",
                value: self.format_number(summary.pages),
            },
            SummaryRow {
                key: "Content Lines",
                value: self.format_number(summary.lines),
            },
            SummaryRow {
                key: "Errors",
                value: self.format_number(summary.errors.len()),
            },
        ];

        Self::style(&mut Table::new(rows))
    }

    /// Table of per-entry errors, at most ten rows
    pub fn errors_table(&self, errors: &[PipelineError]) -> String {
        #[derive(Tabled)]
        struct ErrorRow {
            #[tabled(rename = "Path")]
            path: String,

            #[tabled(rename = "Error")]
            message: String,
        }

        let rows: Vec<ErrorRow> = errors
            .iter()
            .take(MAX_LISTED_ERRORS)
            .map(|error| ErrorRow {
                path: error
                    .path
                    .as_ref()
                    .map(|p| truncate_for_display(&p.display().to_string(), MAX_PATH_WIDTH))
                    .unwrap_or_else(|| "-".to_string()),
                message: error.message.clone(),
            })
            .collect();

        let mut table = Self::style(&mut Table::new(rows));
        if errors.len() > MAX_LISTED_ERRORS {
            table.push_str(&format!(
                "\n... and {} more",
                errors.len() - MAX_LISTED_ERRORS
            ));
        }
        table
    }

    fn generate_console_report(&self, summary: &GenerationSummary) -> String {
        let summary_table = self.create_summary_table(summary);

        if summary.errors.is_empty() {
            return format!("DOCUMENT COMPLETE\n{}", summary_table);
        }

        format!(
            "ENTRIES WITH ERRORS\n{}\n\nDOCUMENT COMPLETE\n{}",
            self.errors_table(&summary.errors),
            summary_table
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn summary(errors: Vec<PipelineError>) -> GenerationSummary {
        GenerationSummary {
            output_file: PathBuf::from("out.treedoc.xml"),
            duration: Duration::from_millis(12),
            files_total: 1500,
            files_rendered: 1200,
            files_skipped: 300,
            tree_entries: 1700,
            pages: 2400,
            lines: 2_500_000,
            errors,
        }
    }

    #[test]
    fn test_summary_report() {
        let report = Reporter::new(ReportFormat::ConsoleTable).generate_report(&summary(vec![]));

        assert!(report.starts_with("DOCUMENT COMPLETE"));
        assert!(report.contains("out.treedoc.xml"));
        assert!(report.contains("1.2K of 1.5K"));
        assert!(report.contains("2.5M"));
        assert!(!report.contains("ENTRIES WITH ERRORS"));
    }

    #[test]
    fn test_error_rows_are_capped() {
        let errors: Vec<PipelineError> = (0..12)
            .map(|i| PipelineError::for_path(format!("/root/f{}.txt", i), "Permission denied"))
            .collect();
        let report = Reporter::new(ReportFormat::ConsoleTable).generate_report(&summary(errors));

        assert!(report.starts_with("ENTRIES WITH ERRORS"));
        assert!(report.contains("/root/f9.txt"));
        assert!(!report.contains("/root/f10.txt"));
        assert!(report.contains("... and 2 more"));
    }
}
