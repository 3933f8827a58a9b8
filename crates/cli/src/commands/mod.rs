//! CLI Commands

pub mod plan;
pub mod run;
pub mod summary;

use anyhow::{Context, Result};
use qaflow_common::{Priority, Suite, TestCase};
use std::path::PathBuf;
use tracing::debug;

/// Test cases selected from the given files and directories
pub struct Selection {
    pub sources: Vec<String>,
    pub cases: Vec<TestCase>,
}

/// Load suites from `paths` and apply the name and priority filters
pub fn load_cases(
    paths: &[PathBuf],
    filter: Option<&str>,
    priority: Option<Priority>,
) -> Result<Selection> {
    let mut sources = Vec::new();
    let mut cases = Vec::new();

    for path in paths {
        let suites = Suite::load_path(path)
            .with_context(|| format!("failed to load test cases from {}", path.display()))?;

        for mut suite in suites {
            if let Some(needle) = filter {
                suite.retain_named(needle);
            }
            if let Some(priority) = priority {
                suite.retain_priority(priority);
            }
            debug!("{}: {} case(s) selected", suite.source.display(), suite.cases.len());
            sources.push(suite.source.display().to_string());
            cases.extend(suite.cases);
        }
    }

    Ok(Selection { sources, cases })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_cases_applies_filters() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("auth.json"),
            r#"{"testCases": [
                {"testName": "Valid login", "steps": [], "priority": "high"},
                {"testName": "Invalid login", "steps": []},
                {"testName": "Open account", "steps": [], "priority": "high"}
            ]}"#,
        )
        .unwrap();

        let all = load_cases(&[tmp.path().to_path_buf()], None, None).unwrap();
        assert_eq!(all.cases.len(), 3);
        assert_eq!(all.sources.len(), 1);

        let some = load_cases(&[tmp.path().to_path_buf()], Some("LOGIN"), Some(Priority::High)).unwrap();
        let names: Vec<&str> = some.cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Valid login"]);
    }

    #[test]
    fn test_load_cases_missing_path() {
        let err = load_cases(&[PathBuf::from("/no/such/suite.json")], None, None)
            .err()
            .unwrap();
        assert!(format!("{:#}", err).contains("/no/such/suite.json"));
    }
}
