//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use qaflow_common::{CaseResult, RiskLevel, SuiteReport, SuiteSummary};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// One line per test case
#[derive(Serialize)]
pub struct CaseRow<'a> {
    pub name: &'a str,
    pub passed: bool,
    pub steps_passed: usize,
    pub steps_total: usize,
    pub duration_ms: u64,
    pub first_error: Option<&'a str>,
}

impl<'a> From<&'a CaseResult> for CaseRow<'a> {
    fn from(result: &'a CaseResult) -> Self {
        Self {
            name: &result.name,
            passed: result.status.is_passed(),
            steps_passed: result.passed_steps(),
            steps_total: result.steps.len(),
            duration_ms: result.duration_ms,
            first_error: result.errors.first().map(String::as_str),
        }
    }
}

impl TableDisplay for CaseRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["Test Case", "Result", "Steps", "Duration", "First Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.to_string(),
            if self.passed { "✓ passed" } else { "✗ failed" }.to_string(),
            format!("{}/{}", self.steps_passed, self.steps_total),
            format!("{}ms", self.duration_ms),
            self.first_error.unwrap_or("").to_string(),
        ]
    }
}

/// Print a run report: case table plus summary, or the whole report as data
pub fn print_report(report: &SuiteReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(report).unwrap_or_default());
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let rows: Vec<CaseRow<'_>> = report.results.iter().map(CaseRow::from).collect();
            print_list(&rows, format);
            println!();
            print_summary(&report.summary);
        }
    }
}

/// Print the aggregate counts with a colored verdict
pub fn print_summary(summary: &SuiteSummary) {
    let rate = format!("{:.1}%", summary.pass_rate);
    let risk = match summary.risk_level {
        RiskLevel::High => "high".red().bold(),
        RiskLevel::Medium => "medium".yellow().bold(),
        RiskLevel::Low => "low".green().bold(),
    };

    println!("Test Summary:");
    println!("   Total:     {}", summary.total);
    println!("   Passed:    {}", summary.passed.to_string().green());
    println!("   Failed:    {}", summary.failed.to_string().red());
    println!("   Pass rate: {}", rate);
    println!("   Risk:      {}", risk);
    println!("   Duration:  {}ms", summary.duration_ms);
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use qaflow_common::StepResult;

    #[test]
    fn test_case_row() {
        let result = CaseResult::from_steps(
            "Invalid login",
            vec![
                StepResult::passed("Click the Log In button", 12),
                StepResult::failed("Verify the welcome message", "expected welcome message not found", 3),
            ],
            20,
        );
        let row = CaseRow::from(&result).row();
        assert_eq!(row[0], "Invalid login");
        assert_eq!(row[1], "✗ failed");
        assert_eq!(row[2], "1/2");
        assert_eq!(row[3], "20ms");
        assert_eq!(row[4], "Step 2: expected welcome message not found");
        assert_eq!(row.len(), CaseRow::headers().len());
    }
}
