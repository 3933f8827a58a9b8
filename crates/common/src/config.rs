//! Engine configuration
//!
//! Loaded from a TOML file (missing file means defaults), then overridden by
//! environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `BASE_URL` | `application.base_url` |
//! | `LOGIN_URL` | `application.login_url` |
//! | `OVERVIEW_URL` | `application.overview_url` |
//! | `VALID_USERNAME` / `VALID_PASSWORD` | first `application.credentials.valid` entry |
//! | `INVALID_USERNAME` / `INVALID_PASSWORD` | first `application.credentials.invalid` entry |
//! | `USERNAME_SELECTOR` | `application.selectors.username` |
//! | `PASSWORD_SELECTOR` | `application.selectors.password` |
//! | `LOGIN_BUTTON_SELECTOR` | `application.selectors.login_button` |
//! | `LOGOUT_BUTTON_SELECTOR` | `application.selectors.logout_link` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::Credentials;
use crate::{Error, Result};

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory for `test-results.json`
    pub output_dir: PathBuf,

    /// Application under test
    pub application: ApplicationConfig,

    /// Browser gateway settings
    pub gateway: GatewayConfig,

    /// Delays inserted to let page transitions settle
    pub pacing: PacingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-results"),
            application: ApplicationConfig::default(),
            gateway: GatewayConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

/// Application under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub name: String,
    pub base_url: String,
    pub login_url: String,
    pub overview_url: String,
    pub credentials: CredentialSets,
    pub selectors: SelectorConfig,
    pub signatures: AuthSignatures,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "ParaBank Demo".to_string(),
            base_url: "https://parabank.parasoft.com/parabank".to_string(),
            login_url: "https://parabank.parasoft.com/parabank/index.htm".to_string(),
            overview_url: "https://parabank.parasoft.com/parabank/overview.htm".to_string(),
            credentials: CredentialSets::default(),
            selectors: SelectorConfig::default(),
            signatures: AuthSignatures::default(),
        }
    }
}

/// Known-good and known-bad credential pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSets {
    pub valid: Vec<Credentials>,
    pub invalid: Vec<Credentials>,
}

impl Default for CredentialSets {
    fn default() -> Self {
        Self {
            // Real accounts only ever come from the config file or environment
            valid: Vec::new(),
            invalid: vec![Credentials::new("invaliduser", "invalidpass")],
        }
    }
}

/// CSS selectors for the semantic targets the engine knows about
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub username: String,
    pub password: String,
    pub login_button: String,
    pub open_account_button: String,
    pub submit_button: String,
    pub logout_link: String,
    pub account_type: String,
    pub source_account: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            username: r#"input[name="username"]"#.to_string(),
            password: r#"input[name="password"]"#.to_string(),
            login_button: r#"input[type="submit"][value="Log In"]"#.to_string(),
            open_account_button: r#"input[value="Open New Account"]"#.to_string(),
            submit_button: r#"input[type="submit"], button[type="submit"]"#.to_string(),
            logout_link: r#"a[href="logout.htm"]"#.to_string(),
            account_type: r#"select#type"#.to_string(),
            source_account: r#"select#fromAccountId"#.to_string(),
        }
    }
}

/// Page signatures used to classify a login attempt.
///
/// Tokens are matched case-insensitively against the page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSignatures {
    /// Any of these on a page showing the login form means the login failed
    pub failure_tokens: Vec<String>,
    /// All of these present means the login form is showing
    pub login_form_tokens: Vec<String>,
    /// Any of these on the overview URL means the login succeeded
    pub success_tokens: Vec<String>,
    /// All of these together on the overview URL also mean success; empty disables the rule
    pub overview_balance_tokens: Vec<String>,
    pub overview_url_marker: String,
    pub login_url_marker: String,
    /// Post-login elements whose success-path checks fail once login has failed
    pub protected_elements: Vec<String>,
}

impl Default for AuthSignatures {
    fn default() -> Self {
        let strings = |tokens: &[&str]| -> Vec<String> { tokens.iter().map(|t| t.to_string()).collect() };
        Self {
            failure_tokens: strings(&["error", "invalid", "incorrect", "could not be verified", "try again"]),
            login_form_tokens: strings(&["username", "password", "log in"]),
            success_tokens: strings(&["welcome", "accounts overview", "account overview"]),
            overview_balance_tokens: strings(&["overview", "balance"]),
            overview_url_marker: "overview.htm".to_string(),
            login_url_marker: "index.htm".to_string(),
            protected_elements: strings(&[
                "account overview",
                "welcome message",
                "accounts overview",
                "navigation menu",
                "log out",
            ]),
        }
    }
}

impl AuthSignatures {
    /// Whether every token is already lowercase
    pub fn is_normalized(&self) -> bool {
        let lower = |t: &String| t.chars().all(|c| !c.is_uppercase());
        self.failure_tokens.iter().all(lower)
            && self.login_form_tokens.iter().all(lower)
            && self.success_tokens.iter().all(lower)
            && self.overview_balance_tokens.iter().all(lower)
            && lower(&self.overview_url_marker)
            && lower(&self.login_url_marker)
            && self.protected_elements.iter().all(lower)
    }

    /// Copy with every token lowercased
    pub fn normalized(&self) -> Self {
        let lower = |tokens: &[String]| -> Vec<String> { tokens.iter().map(|t| t.to_lowercase()).collect() };
        Self {
            failure_tokens: lower(&self.failure_tokens),
            login_form_tokens: lower(&self.login_form_tokens),
            success_tokens: lower(&self.success_tokens),
            overview_balance_tokens: lower(&self.overview_balance_tokens),
            overview_url_marker: self.overview_url_marker.to_lowercase(),
            login_url_marker: self.login_url_marker.to_lowercase(),
            protected_elements: lower(&self.protected_elements),
        }
    }
}

/// Browser engine driven by the Playwright bridge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser '{}'", other)),
        }
    }
}

/// Browser gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Node.js binary used to run the Playwright bridge
    pub node_binary: PathBuf,
    pub browser: Browser,
    pub headless: bool,
    /// Playwright `slowMo` in milliseconds
    pub slow_mo_ms: u64,
    /// Per-action timeout; an expired action is reported as a failed step
    pub action_timeout_ms: u64,
    /// Time allowed for the bridge to report ready
    pub launch_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            browser: Browser::Chromium,
            headless: true,
            slow_mo_ms: 0,
            action_timeout_ms: 30_000,
            launch_timeout_ms: 30_000,
        }
    }
}

/// Pacing delays between steps and between cases
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub step_delay_ms: u64,
    pub case_delay_ms: u64,
}

impl PacingConfig {
    /// No pacing at all
    pub fn none() -> Self {
        Self {
            step_delay_ms: 0,
            case_delay_ms: 0,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 250,
            case_delay_ms: 1_000,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            debug!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from file and apply process environment overrides
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let app = &mut self.application;

        if let Some(v) = get("BASE_URL") {
            app.base_url = v;
        }
        if let Some(v) = get("LOGIN_URL") {
            app.login_url = v;
        }
        if let Some(v) = get("OVERVIEW_URL") {
            app.overview_url = v;
        }

        override_first(&mut app.credentials.valid, get("VALID_USERNAME"), get("VALID_PASSWORD"));
        override_first(
            &mut app.credentials.invalid,
            get("INVALID_USERNAME"),
            get("INVALID_PASSWORD"),
        );

        let selectors = &mut app.selectors;
        if let Some(v) = get("USERNAME_SELECTOR") {
            selectors.username = v;
        }
        if let Some(v) = get("PASSWORD_SELECTOR") {
            selectors.password = v;
        }
        if let Some(v) = get("LOGIN_BUTTON_SELECTOR") {
            selectors.login_button = v;
        }
        if let Some(v) = get("LOGOUT_BUTTON_SELECTOR") {
            selectors.logout_link = v;
        }
    }

    /// Reject settings the gateway cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.gateway.action_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "gateway.action_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.gateway.launch_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "gateway.launch_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured valid credential pair used as the authentication fallback
    pub fn valid_credentials(&self) -> Option<&Credentials> {
        self.application
            .credentials
            .valid
            .iter()
            .find(|c| !c.username.is_empty())
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join("test-results.json")
    }
}

fn override_first(list: &mut Vec<Credentials>, username: Option<String>, password: Option<String>) {
    if username.is_none() && password.is_none() {
        return;
    }
    if list.is_empty() {
        list.push(Credentials::new("", ""));
    }
    let first = &mut list[0];
    if let Some(u) = username {
        first.username = u;
    }
    if let Some(p) = password {
        first.password = p;
    }
}
