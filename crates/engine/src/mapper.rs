//! Natural-language step to abstract action mapping
//!
//! The mapper is an ordered table of rules. Each rule pairs a predicate over
//! the lowercased step text with a builder that reads the test case's data;
//! the first rule whose predicate matches produces the step's actions. Steps
//! no rule recognises fall back to a single [`AbstractAction::ReadPage`].
//!
//! Standard vocabulary, in precedence order:
//!
//! | rule | step contains | actions |
//! |------|---------------|---------|
//! | `navigate` | "navigate to" | `Navigate` to the first URL in the step, else `baseUrl` / `url` |
//! | `credentials` | "enter" and "username" / "password" | `FillField` per keyword, username first |
//! | `click` | "click" | `Click` on a known button or a labelled element |
//! | `account-type` | "select" and "account type" / "savings" / "checking" | `SelectOption` on the account type dropdown |
//! | `source-account` | "select" and "source account" | `SelectOption` on the source account dropdown |
//! | `verify` | "verify" / "check" | `ReadPage` |

use once_cell::sync::Lazy;
use qaflow_common::TestCase;
use regex::Regex;
use std::fmt;
use tracing::trace;

use crate::action::{AbstractAction, ClickTarget, DropdownKind, FieldKind};
use crate::error::MappingError;
use crate::step::StepText;

static URL_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s'"<>`]+"#).expect("valid regex"));
static QUOTED_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)click\b.*?\s["']([^"']+)["']"#).expect("valid regex"));
static BUTTON_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)click\s+(?:on\s+)?(?:the\s+)?(.+?)\s+(?:button|link)\b").expect("valid regex")
});

pub type RulePredicate = fn(&StepText<'_>) -> bool;
pub type RuleBuilder = fn(&StepText<'_>, &TestCase) -> Result<Vec<AbstractAction>, MappingError>;

/// One entry of the mapping table
#[derive(Clone, Copy)]
pub struct MappingRule {
    pub name: &'static str,
    pub matches: RulePredicate,
    pub build: RuleBuilder,
}

impl fmt::Debug for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingRule").field("name", &self.name).finish()
    }
}

/// Stateless step interpreter
#[derive(Debug, Clone)]
pub struct ActionMapper {
    rules: Vec<MappingRule>,
}

impl Default for ActionMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionMapper {
    /// Mapper with the standard vocabulary
    pub fn new() -> Self {
        Self {
            rules: standard_rules(),
        }
    }

    /// Mapper with no rules; every step maps to `ReadPage`
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones
    pub fn with_rule(mut self, rule: MappingRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Insert a rule ahead of the existing ones
    pub fn with_priority_rule(mut self, rule: MappingRule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    /// Name of the rule that would handle `step`
    pub fn matching_rule(&self, step: &str) -> Option<&'static str> {
        let text = StepText::new(step);
        self.rules.iter().find(|r| (r.matches)(&text)).map(|r| r.name)
    }

    /// Map one step of `case` to its actions
    pub fn map(&self, step: &str, case: &TestCase) -> Result<Vec<AbstractAction>, MappingError> {
        let text = StepText::new(step);
        match self.rules.iter().find(|r| (r.matches)(&text)) {
            Some(rule) => {
                trace!("Step \"{}\" matched rule {}", step, rule.name);
                (rule.build)(&text, case)
            }
            None => {
                trace!("Step \"{}\" matched no rule, reading page", step);
                Ok(vec![AbstractAction::ReadPage])
            }
        }
    }
}

/// The built-in rule table
pub fn standard_rules() -> Vec<MappingRule> {
    vec![
        MappingRule {
            name: "navigate",
            matches: |s| s.contains("navigate to"),
            build: build_navigate,
        },
        MappingRule {
            name: "credentials",
            matches: |s| s.contains("enter") && s.contains_any(&["username", "password"]),
            build: build_credentials,
        },
        MappingRule {
            name: "click",
            matches: |s| s.contains("click"),
            build: build_click,
        },
        MappingRule {
            name: "account-type",
            matches: |s| s.contains("select") && s.contains_any(&["account type", "savings", "checking"]),
            build: build_account_type,
        },
        MappingRule {
            name: "source-account",
            matches: |s| s.contains("select") && s.contains("source account"),
            build: build_source_account,
        },
        MappingRule {
            name: "verify",
            matches: |s| s.contains_any(&["verify", "check"]),
            build: |_, _| Ok(vec![AbstractAction::ReadPage]),
        },
    ]
}

fn build_navigate(step: &StepText<'_>, case: &TestCase) -> Result<Vec<AbstractAction>, MappingError> {
    let url = url_literal(step.raw())
        .or_else(|| case.test_data.get_str("baseUrl"))
        .or_else(|| case.test_data.get_str("url"))
        .ok_or_else(|| MappingError::MissingUrl {
            step: step.raw().to_string(),
        })?;
    Ok(vec![AbstractAction::Navigate { url }])
}

/// First well-formed absolute http(s) URL in `text`, trailing punctuation removed
pub fn url_literal(text: &str) -> Option<String> {
    URL_LITERAL.find_iter(text).find_map(|m| {
        let candidate = m
            .as_str()
            .trim_end_matches(|c| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | ')' | ']' | '}'));
        match url::Url::parse(candidate) {
            Ok(parsed) if parsed.host_str().is_some() => Some(candidate.to_string()),
            _ => None,
        }
    })
}

fn build_credentials(step: &StepText<'_>, case: &TestCase) -> Result<Vec<AbstractAction>, MappingError> {
    let mut actions = Vec::with_capacity(2);
    for (keyword, field) in [("username", FieldKind::Username), ("password", FieldKind::Password)] {
        if !step.contains(keyword) {
            continue;
        }
        let value = case
            .test_data
            .get_str(keyword)
            .ok_or_else(|| MappingError::missing_data(keyword, &case.name))?;
        actions.push(AbstractAction::FillField { field, value });
    }
    Ok(actions)
}

fn build_click(step: &StepText<'_>, _case: &TestCase) -> Result<Vec<AbstractAction>, MappingError> {
    let target = click_target(step).ok_or_else(|| MappingError::UnresolvedClickTarget {
        step: step.raw().to_string(),
    })?;
    Ok(vec![AbstractAction::Click { target }])
}

fn click_target(step: &StepText<'_>) -> Option<ClickTarget> {
    if step.contains_any(&["log in", "login"]) {
        return Some(ClickTarget::LoginButton);
    }
    if step.contains_any(&["open new account", "open account"]) {
        return Some(ClickTarget::OpenAccountButton);
    }
    if step.contains("submit") {
        return Some(ClickTarget::SubmitButton);
    }

    QUOTED_LABEL
        .captures(step.raw())
        .or_else(|| BUTTON_PHRASE.captures(step.raw()))
        .map(|caps| caps[1].trim().to_string())
        .filter(|label| !label.is_empty())
        .map(ClickTarget::Labeled)
}

fn build_account_type(step: &StepText<'_>, case: &TestCase) -> Result<Vec<AbstractAction>, MappingError> {
    let value = match case.test_data.get_str("accountType") {
        Some(value) => value.to_uppercase(),
        None if step.contains("savings") => "SAVINGS".to_string(),
        None if step.contains("checking") => "CHECKING".to_string(),
        None => {
            return Err(MappingError::MissingAccountType {
                step: step.raw().to_string(),
            })
        }
    };
    Ok(vec![AbstractAction::SelectOption {
        dropdown: DropdownKind::AccountType,
        value,
    }])
}

fn build_source_account(_step: &StepText<'_>, case: &TestCase) -> Result<Vec<AbstractAction>, MappingError> {
    let value = case
        .test_data
        .get_str("sourceAccount")
        .ok_or_else(|| MappingError::missing_data("sourceAccount", &case.name))?;
    Ok(vec![AbstractAction::SelectOption {
        dropdown: DropdownKind::SourceAccount,
        value,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn case_with(pairs: &[(&str, &str)]) -> TestCase {
        pairs
            .iter()
            .fold(TestCase::new("Login flow"), |case, (k, v)| case.data(*k, *v))
    }

    fn navigate(url: &str) -> Vec<AbstractAction> {
        vec![AbstractAction::Navigate { url: url.to_string() }]
    }

    #[test_case("Navigate to https://bank.example.test/login", "https://bank.example.test/login" ; "plain literal")]
    #[test_case("Navigate to https://bank.example.test/index.htm.", "https://bank.example.test/index.htm" ; "trailing period")]
    #[test_case("Navigate to (https://bank.example.test/a?b=1), then wait", "https://bank.example.test/a?b=1" ; "parenthesised")]
    #[test_case("navigate to 'http://localhost:8080/app'", "http://localhost:8080/app" ; "quoted with port")]
    fn test_navigate_literal_wins_over_test_data(step: &str, expected: &str) {
        let case = case_with(&[("baseUrl", "https://ignored.example.test")]);
        assert_eq!(ActionMapper::new().map(step, &case).unwrap(), navigate(expected));
    }

    #[test]
    fn test_navigate_falls_back_to_test_data() {
        let mapper = ActionMapper::new();

        let base = case_with(&[("baseUrl", "https://base.example.test"), ("url", "https://url.example.test")]);
        assert_eq!(
            mapper.map("Navigate to the login page", &base).unwrap(),
            navigate("https://base.example.test")
        );

        let only_url = case_with(&[("url", "https://url.example.test")]);
        assert_eq!(
            mapper.map("Navigate to the login page", &only_url).unwrap(),
            navigate("https://url.example.test")
        );

        let err = mapper.map("Navigate to the login page", &TestCase::new("x")).unwrap_err();
        assert!(matches!(err, MappingError::MissingUrl { ref step } if step == "Navigate to the login page"));
    }

    #[test]
    fn test_credentials_come_from_test_data() {
        let case = case_with(&[("username", "john"), ("password", "demo")]);
        let actions = ActionMapper::new()
            .map("Enter the username 'ignored' and password", &case)
            .unwrap();
        assert_eq!(
            actions,
            vec![
                AbstractAction::FillField {
                    field: FieldKind::Username,
                    value: "john".to_string()
                },
                AbstractAction::FillField {
                    field: FieldKind::Password,
                    value: "demo".to_string()
                },
            ]
        );
    }

    #[test_case(&[] ; "key absent")]
    #[test_case(&[("username", "")] ; "empty value")]
    fn test_missing_username_names_key_and_case(data: &[(&str, &str)]) {
        let err = ActionMapper::new()
            .map("Enter the valid username 'x'", &case_with(data))
            .unwrap_err();
        let reason = err.to_string();
        assert!(reason.contains("username"), "{}", reason);
        assert!(reason.contains("Login flow"), "{}", reason);
    }

    #[test_case("Click the Log In button", ClickTarget::LoginButton ; "log in")]
    #[test_case("click login", ClickTarget::LoginButton ; "login")]
    #[test_case("Click Open New Account", ClickTarget::OpenAccountButton ; "open new account")]
    #[test_case("Click the Submit button", ClickTarget::SubmitButton ; "submit")]
    #[test_case("Click on 'Transfer Funds'", ClickTarget::Labeled("Transfer Funds".into()) ; "quoted label")]
    #[test_case("Click the Bill Pay link", ClickTarget::Labeled("Bill Pay".into()) ; "link phrase")]
    #[test_case("Click on the Find Transactions button", ClickTarget::Labeled("Find Transactions".into()) ; "button phrase")]
    fn test_click_targets(step: &str, target: ClickTarget) {
        let actions = ActionMapper::new().map(step, &TestCase::new("c")).unwrap();
        assert_eq!(actions, vec![AbstractAction::Click { target }]);
    }

    #[test]
    fn test_unresolvable_click_is_an_error() {
        let err = ActionMapper::new()
            .map("Click somewhere", &TestCase::new("c"))
            .unwrap_err();
        assert!(matches!(err, MappingError::UnresolvedClickTarget { .. }));
    }

    #[test_case("Select account type", &[("accountType", "savings")], "SAVINGS" ; "from test data uppercased")]
    #[test_case("Select CHECKING from the list", &[], "CHECKING" ; "inferred checking")]
    #[test_case("Select the savings option", &[], "SAVINGS" ; "inferred savings")]
    #[test_case("Select checking account type", &[("accountType", "Savings")], "SAVINGS" ; "test data wins")]
    fn test_account_type(step: &str, data: &[(&str, &str)], expected: &str) {
        let actions = ActionMapper::new().map(step, &case_with(data)).unwrap();
        assert_eq!(
            actions,
            vec![AbstractAction::SelectOption {
                dropdown: DropdownKind::AccountType,
                value: expected.to_string()
            }]
        );
    }

    #[test]
    fn test_account_type_without_hint_fails() {
        let err = ActionMapper::new()
            .map("Select the account type", &TestCase::new("c"))
            .unwrap_err();
        assert!(matches!(err, MappingError::MissingAccountType { .. }));
    }

    #[test]
    fn test_source_account() {
        let mapper = ActionMapper::new();
        let case = case_with(&[("sourceAccount", "13344")]);
        assert_eq!(
            mapper.map("Select the source account", &case).unwrap(),
            vec![AbstractAction::SelectOption {
                dropdown: DropdownKind::SourceAccount,
                value: "13344".to_string()
            }]
        );

        let err = mapper.map("Select the source account", &TestCase::new("Transfer")).unwrap_err();
        assert!(err.to_string().contains("sourceAccount"));
    }

    #[test_case("Verify the welcome message (EXPECT: SUCCESS)" ; "verify")]
    #[test_case("Check that the balance is shown" ; "check")]
    #[test_case("Observe the page" ; "fallback")]
    fn test_read_page(step: &str) {
        let actions = ActionMapper::new().map(step, &TestCase::new("c")).unwrap();
        assert_eq!(actions, vec![AbstractAction::ReadPage]);
    }

    #[test]
    fn test_first_rule_wins() {
        let mapper = ActionMapper::new();
        // "click" precedes "verify"
        assert_eq!(mapper.matching_rule("Click Log In and verify"), Some("click"));
        // "account-type" precedes "source-account"
        assert_eq!(
            mapper.matching_rule("Select the source account for savings"),
            Some("account-type")
        );
        assert_eq!(mapper.matching_rule("Observe the page"), None);
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let mapper = ActionMapper::new();
        let case = case_with(&[
            ("username", "john"),
            ("password", "demo"),
            ("baseUrl", "https://bank.example.test"),
        ]);
        for step in [
            "Navigate to the login page",
            "Enter username and password",
            "Click the Log In button",
            "Verify that the welcome message is shown (EXPECT: SUCCESS)",
        ] {
            assert_eq!(mapper.map(step, &case), mapper.map(step, &case));
        }
    }

    #[test]
    fn test_custom_rule_extends_vocabulary() {
        let mapper = ActionMapper::new().with_priority_rule(MappingRule {
            name: "logout",
            matches: |s| s.contains("log out") && s.contains("click"),
            build: |_, _| {
                Ok(vec![AbstractAction::Click {
                    target: ClickTarget::Labeled("Log Out".to_string()),
                }])
            },
        });
        assert_eq!(mapper.matching_rule("Click Log Out"), Some("logout"));
        assert_eq!(
            ActionMapper::empty().map("Click Log In", &TestCase::new("c")).unwrap(),
            vec![AbstractAction::ReadPage]
        );
    }
}
