//! Core types for qaflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Test case priority as assigned by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority '{}' (expected high, medium or low)", other)),
        }
    }
}

/// Key-value bag of test data attached to a test case.
///
/// Values are arbitrary JSON; [`TestData::get_str`] renders scalars as text
/// and treats empty strings and nulls as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestData(BTreeMap<String, serde_json::Value>);

impl TestData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Text value for `key`, or `None` when missing, null or empty
    pub fn get_str(&self, key: &str) -> Option<String> {
        let text = match self.0.get(key)? {
            serde_json::Value::Null => return None,
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// A generated test case: ordered natural-language steps plus test data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(rename = "testName", alias = "name")]
    pub name: String,
    pub steps: Vec<String>,
    /// Free-text assertions from the generator; informational only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertions: Vec<String>,
    #[serde(default, alias = "test_data")]
    pub test_data: TestData,
    #[serde(default)]
    pub priority: Priority,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            assertions: Vec::new(),
            test_data: TestData::default(),
            priority: Priority::default(),
        }
    }

    pub fn step(mut self, step: impl Into<String>) -> Self {
        self.steps.push(step.into());
        self
    }

    pub fn steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps.extend(steps.into_iter().map(Into::into));
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.test_data.insert(key, value);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// A username/password pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials carried by a test data bag; missing values become empty strings
    pub fn from_test_data(data: &TestData) -> Self {
        Self {
            username: data.get_str("username").unwrap_or_default(),
            password: data.get_str("password").unwrap_or_default(),
        }
    }
}

/// Outcome of a step or a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Failed,
}

impl Status {
    pub fn is_passed(&self) -> bool {
        matches!(self, Status::Passed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Passed => write!(f, "passed"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

/// Result of executing one natural-language step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_text: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    pub duration_ms: u64,
}

impl StepResult {
    pub fn passed(step_text: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step_text: step_text.into(),
            status: Status::Passed,
            error_reason: None,
            duration_ms,
        }
    }

    pub fn failed(step_text: impl Into<String>, reason: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            step_text: step_text.into(),
            status: Status::Failed,
            error_reason: Some(reason.into()),
            duration_ms,
        }
    }
}

/// Aggregated result of one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub name: String,
    pub status: Status,
    pub steps: Vec<StepResult>,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl CaseResult {
    /// Aggregate step results; status and errors are derived from the steps
    pub fn from_steps(name: impl Into<String>, steps: Vec<StepResult>, duration_ms: u64) -> Self {
        let errors: Vec<String> = steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.status == Status::Failed)
            .map(|(i, s)| {
                format!(
                    "Step {}: {}",
                    i + 1,
                    s.error_reason.as_deref().unwrap_or("unknown error")
                )
            })
            .collect();
        let status = if errors.is_empty() {
            Status::Passed
        } else {
            Status::Failed
        };

        Self {
            name: name.into(),
            status,
            steps,
            errors,
            duration_ms,
        }
    }

    pub fn passed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_passed()).count()
    }
}

/// Risk classification derived from the pass rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    /// Below 70% is high risk, below 90% medium, otherwise low
    pub fn from_pass_rate(pass_rate: f64) -> Self {
        if pass_rate < 70.0 {
            RiskLevel::High
        } else if pass_rate < 90.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::Low => write!(f, "low"),
        }
    }
}

/// Aggregate counts over a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage in `0.0..=100.0`
    pub pass_rate: f64,
    pub duration_ms: u64,
    pub risk_level: RiskLevel,
}

impl SuiteSummary {
    pub fn from_results(results: &[CaseResult], duration_ms: u64) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.status.is_passed()).count();
        let failed = total - passed;
        let pass_rate = if total > 0 {
            (passed as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        Self {
            total,
            passed,
            failed,
            pass_rate,
            duration_ms,
            risk_level: RiskLevel::from_pass_rate(pass_rate),
        }
    }
}

/// Everything a run produces, as persisted to `test-results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub sources: Vec<String>,
    pub results: Vec<CaseResult>,
    pub summary: SuiteSummary,
}

impl SuiteReport {
    pub fn new(
        started_at: DateTime<Utc>,
        sources: Vec<String>,
        results: Vec<CaseResult>,
        summary: SuiteSummary,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at,
            sources,
            results,
            summary,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("high", Ok(Priority::High) ; "lowercase")]
    #[test_case("Medium", Ok(Priority::Medium) ; "capitalised")]
    #[test_case("LOW", Ok(Priority::Low) ; "uppercase")]
    #[test_case("urgent", Err(()) ; "unknown")]
    fn test_priority_from_str(input: &str, expected: Result<Priority, ()>) {
        assert_eq!(input.parse::<Priority>().map_err(|_| ()), expected);
    }

    #[test_case(100.0, RiskLevel::Low ; "all passed")]
    #[test_case(90.0, RiskLevel::Low ; "low boundary")]
    #[test_case(89.9, RiskLevel::Medium ; "just under low")]
    #[test_case(70.0, RiskLevel::Medium ; "medium boundary")]
    #[test_case(69.9, RiskLevel::High ; "just under medium")]
    fn test_risk_level_boundaries(pass_rate: f64, expected: RiskLevel) {
        assert_eq!(RiskLevel::from_pass_rate(pass_rate), expected);
    }

    #[test]
    fn test_case_result_derives_status_and_errors() {
        let result = CaseResult::from_steps(
            "login",
            vec![
                StepResult::passed("Navigate to https://example.test", 3),
                StepResult::failed("Enter the username", "missing username", 0),
            ],
            10,
        );
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.errors, vec!["Step 2: missing username".to_string()]);
        assert_eq!(result.passed_steps(), 1);

        let clean = CaseResult::from_steps("ok", vec![StepResult::passed("Verify", 1)], 1);
        assert_eq!(clean.status, Status::Passed);
        assert!(clean.errors.is_empty());
    }

    #[test]
    fn test_summary_pass_rate_and_risk() {
        let pass = CaseResult::from_steps("a", vec![StepResult::passed("x", 0)], 0);
        let fail = CaseResult::from_steps("b", vec![StepResult::failed("x", "boom", 0)], 0);

        let summary = SuiteSummary::from_results(&[pass.clone(), pass.clone(), pass, fail], 40);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.failed, 1);
        assert!((summary.pass_rate - 75.0).abs() < f64::EPSILON);
        assert_eq!(summary.risk_level, RiskLevel::Medium);

        let empty = SuiteSummary::from_results(&[], 0);
        assert_eq!(empty.pass_rate, 0.0);
        assert_eq!(empty.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_test_data_treats_empty_as_missing() {
        let data = TestData::new()
            .with("username", "")
            .with("initialDeposit", 100)
            .with("password", serde_json::Value::Null);
        assert_eq!(data.get_str("username"), None);
        assert_eq!(data.get_str("password"), None);
        assert_eq!(data.get_str("initialDeposit").as_deref(), Some("100"));
        assert!(!data.contains("sourceAccount"));
    }

    #[test]
    fn test_case_deserializes_generator_shape() {
        let json = r#"{
            "testName": "Valid login",
            "steps": ["Navigate to the login page"],
            "assertions": ["User sees overview"],
            "testData": {"username": "bob", "password": "pw"},
            "priority": "high"
        }"#;
        let case: TestCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.name, "Valid login");
        assert_eq!(case.priority, Priority::High);
        assert_eq!(case.test_data.get_str("username").as_deref(), Some("bob"));

        let minimal: TestCase = serde_json::from_str(r#"{"name": "n", "steps": []}"#).unwrap();
        assert_eq!(minimal.priority, Priority::Medium);
        assert!(minimal.test_data.is_empty());
    }
}
