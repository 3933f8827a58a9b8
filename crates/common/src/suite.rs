//! Loading generated test cases from disk
//!
//! Accepted inputs:
//! - `.json` / `.yaml` / `.yml`: either a bare list of test cases or an object
//!   with a `testCases` list
//! - `.md`: the last fenced `json` block holding `{"testCases": [...]}`, or
//!   failing that, `### Test Case N:` sections with numbered steps, bulleted
//!   assertions and a fenced JSON test-data block

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::types::{Priority, TestCase, TestData};
use crate::{Error, Result};

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid regex"));
static CASE_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"###\s*Test Case\s+\d+:").expect("valid regex"));
static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\d+\.\s*(.+?)\s*$").expect("valid regex"));
static BULLET_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*-\s*(.+?)\s*$").expect("valid regex"));

#[derive(Deserialize)]
#[serde(untagged)]
enum SuiteDocument {
    Wrapped {
        #[serde(rename = "testCases", alias = "test_cases")]
        test_cases: Vec<TestCase>,
    },
    Bare(Vec<TestCase>),
}

impl SuiteDocument {
    fn into_cases(self) -> Vec<TestCase> {
        match self {
            SuiteDocument::Wrapped { test_cases } => test_cases,
            SuiteDocument::Bare(cases) => cases,
        }
    }
}

/// Test cases loaded from one source file
#[derive(Debug, Clone)]
pub struct Suite {
    pub source: PathBuf,
    pub cases: Vec<TestCase>,
}

impl Suite {
    pub fn from_json(json: &str) -> Result<Vec<TestCase>> {
        let doc: SuiteDocument = serde_json::from_str(json)?;
        Ok(doc.into_cases())
    }

    pub fn from_yaml(yaml: &str) -> Result<Vec<TestCase>> {
        let doc: SuiteDocument = serde_yaml::from_str(yaml)?;
        Ok(doc.into_cases())
    }

    /// Parse a markdown test-case document
    pub fn from_markdown(markdown: &str) -> Option<Vec<TestCase>> {
        if let Some(last) = JSON_BLOCK.captures_iter(markdown).last() {
            match serde_json::from_str::<SuiteDocument>(&last[1]) {
                Ok(doc) => return Some(doc.into_cases()),
                Err(e) => debug!("Last JSON block is not a suite ({}), extracting sections", e),
            }
        }

        let cases = extract_sections(markdown);
        if cases.is_empty() {
            None
        } else {
            Some(cases)
        }
    }

    /// Load a single suite file, dispatching on extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let cases = match ext.as_str() {
            "json" => Self::from_json(&content)?,
            "yaml" | "yml" => Self::from_yaml(&content)?,
            "md" | "markdown" => Self::from_markdown(&content)
                .ok_or_else(|| Error::invalid_suite(path, "no test cases found in markdown"))?,
            _ => return Err(Error::UnsupportedFormat(path.display().to_string())),
        };

        debug!("Loaded {} test case(s) from {}", cases.len(), path.display());
        Ok(Self {
            source: path.to_path_buf(),
            cases,
        })
    }

    /// Load every suite under a directory, in file-name order.
    ///
    /// Files that do not hold test cases (empty markdown, `package.json`, a
    /// previous `test-results.json`) are skipped with a warning; I/O errors
    /// still abort the load.
    pub fn load_all(dir: &Path) -> Result<Vec<Self>> {
        let mut suites = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_suite_file(e.path()))
        {
            match Self::from_file(entry.path()) {
                Ok(suite) => suites.push(suite),
                Err(Error::InvalidSuite { path, reason }) => {
                    warn!("Skipping {}: {}", path, reason);
                }
                Err(e @ (Error::Serialization(_) | Error::Yaml(_))) => {
                    warn!("Skipping {}: not a test suite ({})", entry.path().display(), e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(suites)
    }

    /// Load a file or a directory
    pub fn load_path(path: &Path) -> Result<Vec<Self>> {
        if path.is_dir() {
            Self::load_all(path)
        } else if path.exists() {
            Ok(vec![Self::from_file(path)?])
        } else {
            Err(Error::NotFound {
                kind: "suite".to_string(),
                id: path.display().to_string(),
            })
        }
    }

    /// Keep only cases whose name contains `needle` (case-insensitive)
    pub fn retain_named(&mut self, needle: &str) {
        let needle = needle.to_lowercase();
        self.cases.retain(|c| c.name.to_lowercase().contains(&needle));
    }

    pub fn retain_priority(&mut self, priority: Priority) {
        self.cases.retain(|c| c.priority == priority);
    }
}

fn is_suite_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            matches!(ext.as_str(), "json" | "yaml" | "yml" | "md" | "markdown")
        })
        .unwrap_or(false)
}

/// Structural extraction for markdown without a suite-level JSON block
fn extract_sections(markdown: &str) -> Vec<TestCase> {
    let mut cases = Vec::new();

    for (i, section) in CASE_HEADER.split(markdown).enumerate().skip(1) {
        let name = section
            .lines()
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Test Case {}", i));

        let steps: Vec<String> = between(section, "#### Test Steps:", &["#### Assertions:", "#### Test Data:"])
            .map(|block| {
                NUMBERED_ITEM
                    .captures_iter(block)
                    .map(|c| c[1].to_string())
                    .collect()
            })
            .unwrap_or_default();

        let assertions: Vec<String> = between(section, "#### Assertions:", &["#### Test Data:"])
            .map(|block| {
                BULLET_ITEM
                    .captures_iter(block)
                    .map(|c| c[1].to_string())
                    .collect()
            })
            .unwrap_or_default();

        let test_data = match JSON_BLOCK.captures(section) {
            Some(c) => serde_json::from_str::<TestData>(&c[1]).unwrap_or_else(|e| {
                warn!("Could not parse test data for '{}': {}", name, e);
                TestData::default()
            }),
            None => TestData::default(),
        };

        if steps.is_empty() {
            continue;
        }

        let mut case = TestCase::new(name).steps(steps);
        case.assertions = assertions;
        case.test_data = test_data;
        cases.push(case);
    }

    cases
}

/// Text after `start` up to the first of `ends` (or the end of the section)
fn between<'a>(section: &'a str, start: &str, ends: &[&str]) -> Option<&'a str> {
    let from = section.find(start)? + start.len();
    let rest = &section[from..];
    let to = ends
        .iter()
        .filter_map(|end| rest.find(end))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..to])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STRUCTURED_MD: &str = r#"
# AUTH-001 Test Cases

### Test Case 1: Valid login
#### Test Steps:
1. Navigate to the login page
2. Enter the valid username
3. Click the Log In button

#### Assertions:
- User lands on the overview page

#### Test Data:
```json
{"username": "bob", "password": "pw", "baseUrl": "https://bank.example.test"}
```

### Test Case 2: Empty section
#### Test Steps:

#### Assertions:
- nothing
"#;

    #[test]
    fn test_parse_wrapped_and_bare_json() {
        let wrapped = r#"{"testCases": [{"testName": "a", "steps": ["Verify x"]}]}"#;
        assert_eq!(Suite::from_json(wrapped).unwrap().len(), 1);

        let bare = r#"[{"testName": "a", "steps": []}, {"testName": "b", "steps": []}]"#;
        assert_eq!(Suite::from_json(bare).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
testCases:
  - testName: Open savings account
    priority: low
    steps:
      - Select savings account type
    testData:
      accountType: SAVINGS
"#;
        let cases = Suite::from_yaml(yaml).unwrap();
        assert_eq!(cases[0].priority, Priority::Low);
        assert_eq!(cases[0].test_data.get_str("accountType").as_deref(), Some("SAVINGS"));
    }

    #[test]
    fn test_markdown_prefers_last_suite_block() {
        let md = r#"
Some notes.

```json
{"not": "a suite"}
```

## Automation-Ready JSON
```json
{"testCases": [{"testName": "From JSON", "steps": ["Verify welcome"]}]}
```
"#;
        let cases = Suite::from_markdown(md).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].name, "From JSON");
    }

    #[test]
    fn test_markdown_structural_fallback() {
        let cases = Suite::from_markdown(STRUCTURED_MD).unwrap();
        assert_eq!(cases.len(), 1);
        let case = &cases[0];
        assert_eq!(case.name, "Valid login");
        assert_eq!(
            case.steps,
            vec![
                "Navigate to the login page",
                "Enter the valid username",
                "Click the Log In button"
            ]
        );
        assert_eq!(case.assertions, vec!["User lands on the overview page"]);
        assert_eq!(case.test_data.get_str("username").as_deref(), Some("bob"));
    }

    #[test]
    fn test_markdown_without_cases() {
        assert!(Suite::from_markdown("# Just a readme").is_none());
    }

    #[test]
    fn test_load_all_sorted_and_skips_empty_markdown() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("b.json"),
            r#"[{"testName": "second", "steps": []}]"#,
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("a.yaml"),
            "- testName: first\n  steps: []\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("README.md"), "# notes").unwrap();
        std::fs::write(tmp.path().join("ignored.txt"), "nope").unwrap();

        let suites = Suite::load_all(tmp.path()).unwrap();
        let names: Vec<&str> = suites
            .iter()
            .flat_map(|s| s.cases.iter().map(|c| c.name.as_str()))
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_load_all_skips_results_and_foreign_json() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("auth.json"),
            r#"{"testCases": [{"testName": "Valid login", "steps": ["Verify welcome"]}]}"#,
        )
        .unwrap();
        std::fs::write(tmp.path().join("package.json"), r#"{"name": "bank-tests", "private": true}"#).unwrap();

        let results_dir = tmp.path().join("test-results");
        std::fs::create_dir(&results_dir).unwrap();
        let results = vec![crate::CaseResult::from_steps("Valid login", vec![], 3)];
        let summary = crate::SuiteSummary::from_results(&results, 3);
        let report = crate::SuiteReport::new(chrono::Utc::now(), vec![], results, summary);
        std::fs::write(
            results_dir.join("test-results.json"),
            serde_json::to_string_pretty(&report).unwrap(),
        )
        .unwrap();

        let suites = Suite::load_all(tmp.path()).unwrap();
        assert_eq!(suites.len(), 1);
        assert_eq!(suites[0].cases[0].name, "Valid login");

        // Named explicitly, a file that is not a suite is still an error
        let err = Suite::load_path(&results_dir.join("test-results.json")).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_load_path_missing() {
        let err = Suite::load_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_filters() {
        let mut suite = Suite {
            source: PathBuf::from("x.json"),
            cases: vec![
                TestCase::new("Valid Login").with_priority(Priority::High),
                TestCase::new("Invalid login"),
                TestCase::new("Open account").with_priority(Priority::High),
            ],
        };
        suite.retain_named("login");
        assert_eq!(suite.cases.len(), 2);
        suite.retain_priority(Priority::High);
        assert_eq!(suite.cases.len(), 1);
        assert_eq!(suite.cases[0].name, "Valid Login");
    }
}
