//! Test case runner that sequences mapper, gateway, session and oracle

use qaflow_common::{
    AuthSignatures, CaseResult, Credentials, EngineConfig, PacingConfig, StepResult, SuiteReport,
    SuiteSummary, TestCase,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::action::AbstractAction;
use crate::error::StepError;
use crate::gateway::AutomationGateway;
use crate::mapper::ActionMapper;
use crate::oracle::VerificationOracle;
use crate::session::SessionTracker;
use crate::step::StepText;

/// Lifecycle of one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasePhase {
    Pending,
    Running,
    Passed,
    Failed,
}

impl std::fmt::Display for CasePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CasePhase::Pending => write!(f, "pending"),
            CasePhase::Running => write!(f, "running"),
            CasePhase::Passed => write!(f, "passed"),
            CasePhase::Failed => write!(f, "failed"),
        }
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub pacing: PacingConfig,
    /// Credentials a login attempt is compared against when the page is inconclusive
    pub valid_credentials: Option<Credentials>,
    pub signatures: AuthSignatures,
}

impl RunnerConfig {
    /// Runner settings without pacing delays
    pub fn unpaced() -> Self {
        Self {
            pacing: PacingConfig::none(),
            ..Self::default()
        }
    }

    pub fn with_valid_credentials(mut self, credentials: Credentials) -> Self {
        self.valid_credentials = Some(credentials);
        self
    }
}

impl From<&EngineConfig> for RunnerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            pacing: config.pacing.clone(),
            valid_credentials: config.valid_credentials().cloned(),
            signatures: config.application.signatures.clone(),
        }
    }
}

/// Results of a sequential run over many cases
#[derive(Debug, Clone)]
pub struct SuiteRun {
    pub results: Vec<CaseResult>,
    pub summary: SuiteSummary,
}

/// Runs test cases one step at a time against a gateway
pub struct TestRunner {
    mapper: ActionMapper,
    oracle: VerificationOracle,
    pacing: PacingConfig,
    valid_credentials: Option<Credentials>,
    signatures: AuthSignatures,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            mapper: ActionMapper::new(),
            oracle: VerificationOracle::new(),
            pacing: config.pacing,
            valid_credentials: config.valid_credentials,
            signatures: config.signatures.normalized(),
        }
    }

    pub fn with_mapper(mut self, mapper: ActionMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_oracle(mut self, oracle: VerificationOracle) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn mapper(&self) -> &ActionMapper {
        &self.mapper
    }

    /// Run every case in order; a failing case never stops the run
    pub async fn run_suite<G>(&self, gateway: &mut G, cases: &[TestCase]) -> SuiteRun
    where
        G: AutomationGateway + ?Sized,
    {
        let start = Instant::now();
        let mut results = Vec::with_capacity(cases.len());

        info!("Running {} test case(s)...", cases.len());

        for (index, case) in cases.iter().enumerate() {
            if index > 0 {
                pause(self.pacing.case_delay_ms).await;
            }
            info!("Test case {}/{}: {}", index + 1, cases.len(), case.name);

            let result = self.run_case(&mut *gateway, case).await;
            if result.status.is_passed() {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!("✗ {} - {}", result.name, result.errors.join("; "));
            }
            results.push(result);
        }

        let summary = SuiteSummary::from_results(&results, start.elapsed().as_millis() as u64);

        info!("");
        info!(
            "Test Results: {} passed, {} failed ({:.1}% pass rate, {} ms)",
            summary.passed, summary.failed, summary.pass_rate, summary.duration_ms
        );

        SuiteRun { results, summary }
    }

    /// Run a single test case with a fresh session
    pub async fn run_case<G>(&self, gateway: &mut G, case: &TestCase) -> CaseResult
    where
        G: AutomationGateway + ?Sized,
    {
        let start = Instant::now();
        let mut phase = CasePhase::Pending;
        debug!("{}: {}", case.name, phase);

        let mut session = SessionTracker::new(self.valid_credentials.as_ref(), &self.signatures);
        phase = CasePhase::Running;
        debug!("{}: {}", case.name, phase);

        let mut steps = Vec::with_capacity(case.steps.len());
        for (index, step) in case.steps.iter().enumerate() {
            if index > 0 {
                pause(self.pacing.step_delay_ms).await;
            }
            let result = self.run_step(&mut *gateway, &mut session, case, index, step).await;
            steps.push(result);
        }

        let result = CaseResult::from_steps(&case.name, steps, start.elapsed().as_millis() as u64);
        phase = if result.status.is_passed() {
            CasePhase::Passed
        } else {
            CasePhase::Failed
        };
        debug!("{}: {} (session {})", case.name, phase, session.auth());
        result
    }

    async fn run_step<G>(
        &self,
        gateway: &mut G,
        session: &mut SessionTracker<'_>,
        case: &TestCase,
        index: usize,
        step: &str,
    ) -> StepResult
    where
        G: AutomationGateway + ?Sized,
    {
        let start = Instant::now();
        debug!("Step {}: {}", index + 1, step);

        let outcome = self.execute_step(&mut *gateway, session, case, step).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                debug!("  ✓ step {} ({} ms)", index + 1, duration_ms);
                StepResult::passed(step, duration_ms)
            }
            Err(e) => {
                match &e {
                    StepError::Gateway(g) if g.is_fatal() => error!("  ✗ step {}: {}", index + 1, e),
                    StepError::Gateway(_) => warn!("  ✗ step {}: {}", index + 1, e),
                    _ => debug!("  ✗ step {}: {}", index + 1, e),
                }
                StepResult::failed(step, e.to_string(), duration_ms)
            }
        }
    }

    async fn execute_step<G>(
        &self,
        gateway: &mut G,
        session: &mut SessionTracker<'_>,
        case: &TestCase,
        step: &str,
    ) -> Result<(), StepError>
    where
        G: AutomationGateway + ?Sized,
    {
        let text = StepText::new(step);
        let actions = self.mapper.map(step, case)?;
        let reads_page = actions.iter().any(AbstractAction::is_read);

        for action in &actions {
            let snapshot = match gateway.execute(action).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    if action.is_read() {
                        session.observe_failed_read();
                    }
                    // A failed login already rules out success-path checks
                    if reads_page {
                        if let Some(reason) = session.cascade_reason(&text) {
                            return Err(StepError::AuthCascade(reason));
                        }
                    }
                    return Err(e.into());
                }
            };

            if action.is_login_click() {
                session.record_login_attempt(Credentials::from_test_data(&case.test_data));
            }

            if action.is_read() {
                session.observe_read(&snapshot);
                if let Some(reason) = session.cascade_reason(&text) {
                    return Err(StepError::AuthCascade(reason));
                }
                let verdict = self.oracle.verify(&text, &snapshot);
                if !verdict.passed {
                    return Err(StepError::Verification(
                        verdict.reason.unwrap_or_else(|| "verification failed".to_string()),
                    ));
                }
            }
        }

        Ok(())
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Write a run report to `path`, creating its directory
pub fn write_results(path: &Path, report: &SuiteReport) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;

    info!("Results written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::ScriptedGateway;
    use qaflow_common::Status;

    #[tokio::test]
    async fn test_mapping_error_is_recorded_and_run_continues() {
        let runner = TestRunner::with_config(RunnerConfig::unpaced());
        let mut gateway = ScriptedGateway::blank();
        let log = gateway.log();

        let case = TestCase::new("Missing data")
            .step("Enter the username")
            .step("Verify the page loads");
        let result = runner.run_case(&mut gateway, &case).await;

        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[1].status, Status::Passed);
        assert!(result.errors[0].starts_with("Step 1: "));
        assert!(result.errors[0].contains("testData.username"));
        assert_eq!(log.actions(), vec![AbstractAction::ReadPage]);
    }

    #[tokio::test]
    async fn test_first_failing_action_ends_the_step() {
        let runner = TestRunner::with_config(RunnerConfig::unpaced());
        let mut gateway = ScriptedGateway::queued(vec![Err(GatewayError::ActionFailed {
            action: "fill username \"bob\"".to_string(),
            reason: "no such element".to_string(),
        })]);
        let log = gateway.log();

        let case = TestCase::new("Fill")
            .step("Enter username and password")
            .data("username", "bob")
            .data("password", "pw");
        let result = runner.run_case(&mut gateway, &case).await;

        assert_eq!(log.len(), 1);
        assert_eq!(result.steps.len(), 1);
        assert!(result.errors[0].contains("no such element"));
    }

    #[tokio::test]
    async fn test_suite_summary_counts() {
        let runner = TestRunner::with_config(RunnerConfig::unpaced());
        let mut gateway = ScriptedGateway::with_page("Welcome", "https://bank.test/overview.htm");

        let cases = vec![
            TestCase::new("ok").step("Verify the welcome message"),
            TestCase::new("bad").step("Verify the log out link"),
        ];
        let run = runner.run_suite(&mut gateway, &cases).await;

        assert_eq!(run.results.len(), 2);
        assert_eq!(run.summary.passed, 1);
        assert_eq!(run.summary.failed, 1);
        assert_eq!(
            run.results[1].errors,
            vec!["Step 1: expected log out control not found".to_string()]
        );
    }

    #[test]
    fn test_write_results() {
        let tmp = tempfile::TempDir::new().unwrap();
        let results = vec![CaseResult::from_steps("a", vec![StepResult::passed("x", 1)], 1)];
        let summary = SuiteSummary::from_results(&results, 1);
        let report = SuiteReport::new(chrono::Utc::now(), vec![], results, summary);

        let path = tmp.path().join("out").join("test-results.json");
        write_results(&path, &report).unwrap();
        let loaded: SuiteReport = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(loaded.all_passed());
        assert_eq!(loaded.run_id, report.run_id);
    }

    #[test]
    fn test_runner_config_from_engine_config() {
        let mut config = EngineConfig::default();
        config.application.credentials.valid = vec![Credentials::new("john", "demo")];
        let runner_config = RunnerConfig::from(&config);
        assert_eq!(runner_config.valid_credentials, Some(Credentials::new("john", "demo")));
        assert_eq!(runner_config.pacing.step_delay_ms, 250);
    }
}
