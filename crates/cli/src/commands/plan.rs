//! Plan Command
//!
//! Shows how each step would be interpreted without opening a browser.
//! With `--simulate` the whole engine runs against a scripted gateway that
//! answers every action with an empty page.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use qaflow_common::{EngineConfig, Priority, SuiteReport, TestCase};
use qaflow_engine::{ActionMapper, RunnerConfig, ScriptedGateway, TestRunner};
use serde::Serialize;
use std::path::PathBuf;

use super::load_cases;
use crate::output::{print_list, print_report, print_warning, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct PlanArgs {
    /// Test case files (.json, .yaml, .md) or directories
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Only plan cases whose name contains this text
    #[arg(long)]
    pub filter: Option<String>,

    /// Only plan cases with this priority
    #[arg(long)]
    pub priority: Option<Priority>,

    /// Run the engine against an empty scripted page instead of listing actions
    #[arg(long)]
    pub simulate: bool,
}

/// Interpretation of one step
#[derive(Debug, Serialize)]
pub struct PlanRow {
    pub case: String,
    pub step: usize,
    pub text: String,
    pub rule: String,
    pub actions: Vec<String>,
    pub error: Option<String>,
}

impl TableDisplay for PlanRow {
    fn headers() -> Vec<&'static str> {
        vec!["Test Case", "#", "Step", "Rule", "Actions"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.case.clone(),
            self.step.to_string(),
            self.text.clone(),
            self.rule.clone(),
            match &self.error {
                Some(e) => format!("✗ {}", e),
                None => self.actions.join("\n"),
            },
        ]
    }
}

/// Map every step of every case
pub fn plan_rows(mapper: &ActionMapper, cases: &[TestCase]) -> Vec<PlanRow> {
    let mut rows = Vec::new();
    for case in cases {
        for (index, step) in case.steps.iter().enumerate() {
            let rule = mapper.matching_rule(step).unwrap_or("fallback").to_string();
            let (actions, error) = match mapper.map(step, case) {
                Ok(actions) => (actions.iter().map(ToString::to_string).collect(), None),
                Err(e) => (Vec::new(), Some(e.to_string())),
            };
            rows.push(PlanRow {
                case: case.name.clone(),
                step: index + 1,
                text: step.clone(),
                rule,
                actions,
                error,
            });
        }
    }
    rows
}

/// Returns 0 when every step maps (or every simulated case passes), else 1
pub async fn execute(args: PlanArgs, config: EngineConfig, format: OutputFormat) -> Result<i32> {
    let selection = load_cases(&args.paths, args.filter.as_deref(), args.priority)?;
    if selection.cases.is_empty() {
        print_warning("No test cases matched");
        return Ok(0);
    }

    if args.simulate {
        let mut runner_config = RunnerConfig::from(&config);
        runner_config.pacing = qaflow_common::PacingConfig::none();
        let runner = TestRunner::with_config(runner_config);
        let mut gateway = ScriptedGateway::blank();

        let started_at = Utc::now();
        let run = runner.run_suite(&mut gateway, &selection.cases).await;
        let report = SuiteReport::new(started_at, selection.sources, run.results, run.summary);
        print_report(&report, format);
        return Ok(if report.all_passed() { 0 } else { 1 });
    }

    let rows = plan_rows(&ActionMapper::new(), &selection.cases);
    print_list(&rows, format);

    let unmapped = rows.iter().filter(|r| r.error.is_some()).count();
    if unmapped > 0 {
        print_warning(&format!("{} step(s) cannot be mapped", unmapped));
        Ok(1)
    } else {
        Ok(0)
    }
}
