//! Case-insensitive views over step text

use once_cell::sync::Lazy;
use regex::Regex;

static EXPECT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\(\s*expect\s*:\s*(success|failure)\s*\)").expect("valid regex")
});

/// Outcome a step declares with `(EXPECT: SUCCESS)` or `(EXPECT: FAILURE)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Success,
    Failure,
}

impl Expectation {
    /// The first marker in `text`, if any
    pub fn parse(text: &str) -> Option<Self> {
        let caps = EXPECT_MARKER.captures(text)?;
        if caps[1].eq_ignore_ascii_case("success") {
            Some(Expectation::Success)
        } else {
            Some(Expectation::Failure)
        }
    }
}

/// A step with its lowercased form computed once
#[derive(Debug, Clone)]
pub struct StepText<'a> {
    raw: &'a str,
    lower: String,
    expectation: Option<Expectation>,
}

impl<'a> StepText<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self {
            raw,
            lower: raw.to_lowercase(),
            expectation: Expectation::parse(raw),
        }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn lower(&self) -> &str {
        &self.lower
    }

    pub fn expectation(&self) -> Option<Expectation> {
        self.expectation
    }

    /// `needle` must already be lowercase
    pub fn contains(&self, needle: &str) -> bool {
        self.lower.contains(needle)
    }

    /// Needles must already be lowercase
    pub fn contains_any<S: AsRef<str>>(&self, needles: &[S]) -> bool {
        needles.iter().any(|n| self.lower.contains(n.as_ref()))
    }
}
