//! Pass/fail decisions for page reads
//!
//! A verification step is judged against the page snapshot taken when it
//! ran. Checks are tried in order and the first one that applies decides;
//! a step no check applies to passes.

use std::fmt;
use tracing::debug;

use crate::gateway::PageSnapshot;
use crate::step::{Expectation, StepText};

/// Outcome of verifying one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub reason: Option<String>,
    /// Name of the check that decided, if any applied
    pub check: Option<&'static str>,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            reason: None,
            check: None,
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason: Some(reason.into()),
            check: None,
        }
    }
}

/// Lowercased page content
pub struct Observed {
    pub text: String,
    pub url: String,
}

impl Observed {
    fn new(snapshot: &PageSnapshot) -> Self {
        Self {
            text: snapshot.text_content.to_lowercase(),
            url: snapshot.url.to_lowercase(),
        }
    }
}

/// One row of the decision table
#[derive(Clone, Copy)]
pub struct Check {
    pub name: &'static str,
    pub applies: fn(&StepText<'_>) -> bool,
    pub passes: fn(&Observed) -> bool,
    pub failure: &'static str,
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone)]
pub struct VerificationOracle {
    checks: Vec<Check>,
}

impl Default for VerificationOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationOracle {
    pub fn new() -> Self {
        Self {
            checks: standard_checks(),
        }
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn verify(&self, step: &StepText<'_>, snapshot: &PageSnapshot) -> Verdict {
        let Some(check) = self.checks.iter().find(|c| (c.applies)(step)) else {
            return Verdict::pass();
        };

        let observed = Observed::new(snapshot);
        let passed = (check.passes)(&observed);
        debug!(
            "Check {} {} on {}",
            check.name,
            if passed { "passed" } else { "failed" },
            snapshot.url
        );

        Verdict {
            passed,
            reason: (!passed).then(|| check.failure.to_string()),
            check: Some(check.name),
        }
    }
}

fn shows_accounts_overview(page: &Observed) -> bool {
    page.text.contains("accounts overview") || page.text.contains("account overview")
}

fn shows_log_out(page: &Observed) -> bool {
    page.text.contains("log out") || page.text.contains("logout")
}

/// The built-in decision table
pub fn standard_checks() -> Vec<Check> {
    vec![
        Check {
            name: "overview-redirect",
            applies: |s| {
                s.contains_any(&["redirected", "url contains"])
                    && s.contains("overview")
                    && s.expectation() == Some(Expectation::Success)
            },
            passes: |p| p.url.contains("overview.htm"),
            failure: "expected redirect to overview page",
        },
        Check {
            name: "login-error",
            applies: |s| s.contains("login fails") && s.expectation() == Some(Expectation::Failure),
            passes: |p| !p.url.contains("overview.htm") && p.text.contains("error"),
            failure: "expected error message on failed login",
        },
        Check {
            name: "welcome",
            applies: |s| s.contains("welcome"),
            passes: |p| p.text.contains("welcome"),
            failure: "expected welcome message not found",
        },
        Check {
            name: "accounts-overview",
            applies: |s| s.contains("accounts overview"),
            passes: shows_accounts_overview,
            failure: "expected accounts overview heading not found",
        },
        Check {
            name: "log-out",
            applies: |s| s.contains("log out"),
            passes: shows_log_out,
            failure: "expected log out control not found",
        },
    ]
}
