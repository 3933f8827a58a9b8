//! Summary Command

use anyhow::{Context, Result};
use clap::Args;
use qaflow_common::SuiteReport;
use std::path::PathBuf;

use crate::output::{print_info, print_report, OutputFormat};

#[derive(Args)]
pub struct SummaryArgs {
    /// Path to a test-results.json written by `qaflow run`
    pub results: PathBuf,
}

pub fn load_report(path: &std::path::Path) -> Result<SuiteReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a qaflow results file", path.display()))
}

/// Re-print a stored report; exit code mirrors the stored outcome
pub fn execute(args: SummaryArgs, format: OutputFormat) -> Result<i32> {
    let report = load_report(&args.results)?;

    if matches!(format, OutputFormat::Table | OutputFormat::Plain) {
        print_info(&format!(
            "Run {} started {}",
            report.run_id,
            report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    print_report(&report, format);

    Ok(if report.all_passed() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qaflow_common::{CaseResult, StepResult, SuiteSummary};

    #[test]
    fn test_load_report() {
        let tmp = tempfile::TempDir::new().unwrap();
        let results = vec![CaseResult::from_steps("a", vec![StepResult::failed("x", "boom", 1)], 1)];
        let summary = SuiteSummary::from_results(&results, 1);
        let report = SuiteReport::new(chrono::Utc::now(), vec!["a.json".to_string()], results, summary);
        let path = tmp.path().join("test-results.json");
        std::fs::write(&path, serde_json::to_string(&report).unwrap()).unwrap();

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded.results[0].errors, vec!["Step 1: boom".to_string()]);
        assert!(!loaded.all_passed());

        std::fs::write(&path, "{}").unwrap();
        assert!(load_report(&path).is_err());
    }
}
