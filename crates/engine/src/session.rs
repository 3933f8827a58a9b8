//! Per-case authentication tracking
//!
//! ```text
//!                  login click                 read page
//! Unauthenticated ────────────► AttemptedUnknown ────────► Authenticated
//!                                                 └──────► Failed
//! ```
//!
//! A login click records the credentials from the case's test data. The next
//! page read classifies the attempt from the page content. Once the attempt
//! is known to have failed, success-path checks of post-login page elements
//! are failed outright instead of being judged on whatever page is showing.

use qaflow_common::{AuthSignatures, Credentials};
use std::borrow::Cow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::gateway::PageSnapshot;
use crate::step::{Expectation, StepText};

/// Reason recorded on steps failed by the authentication cascade
pub const AUTH_CASCADE_REASON: &str =
    "authentication failed: cannot verify page elements because login was unsuccessful";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Unauthenticated,
    AttemptedUnknown,
    Authenticated,
    Failed,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => write!(f, "unauthenticated"),
            AuthState::AttemptedUnknown => write!(f, "auth-attempted-unknown"),
            AuthState::Authenticated => write!(f, "authenticated"),
            AuthState::Failed => write!(f, "auth-failed"),
        }
    }
}

fn shows_login_form(sig: &AuthSignatures, text: &str) -> bool {
    sig.login_form_tokens.iter().all(|t| text.contains(t.as_str()))
}

fn shows_success(sig: &AuthSignatures, text: &str) -> bool {
    sig.success_tokens.iter().any(|t| text.contains(t.as_str()))
        || (!sig.overview_balance_tokens.is_empty()
            && sig.overview_balance_tokens.iter().all(|t| text.contains(t.as_str())))
}

fn shows_failure(sig: &AuthSignatures, text: &str) -> bool {
    sig.failure_tokens.iter().any(|t| text.contains(t.as_str()))
}

/// Authentication state of one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub auth: AuthState,
    pub last_credentials: Option<Credentials>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            auth: AuthState::Unauthenticated,
            last_credentials: None,
        }
    }
}

impl SessionState {
    pub fn auth_attempted(&self) -> bool {
        self.auth != AuthState::Unauthenticated
    }

    /// `None` while no attempt has been classified
    pub fn auth_succeeded(&self) -> Option<bool> {
        match self.auth {
            AuthState::Authenticated => Some(true),
            AuthState::Failed => Some(false),
            _ => None,
        }
    }
}

/// Session state machine owned by the runner for a single case.
///
/// Signatures that are not lowercase yet are normalized on construction.
#[derive(Debug)]
pub struct SessionTracker<'a> {
    state: SessionState,
    valid_credentials: Option<&'a Credentials>,
    signatures: Cow<'a, AuthSignatures>,
}

impl<'a> SessionTracker<'a> {
    pub fn new(valid_credentials: Option<&'a Credentials>, signatures: &'a AuthSignatures) -> Self {
        let signatures = if signatures.is_normalized() {
            Cow::Borrowed(signatures)
        } else {
            Cow::Owned(signatures.normalized())
        };
        Self {
            state: SessionState::default(),
            valid_credentials,
            signatures,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn auth(&self) -> AuthState {
        self.state.auth
    }

    pub fn reset(&mut self) {
        self.state = SessionState::default();
    }

    /// A login click was executed with `credentials`
    pub fn record_login_attempt(&mut self, credentials: Credentials) {
        debug!("Login attempted as '{}'", credentials.username);
        self.state.auth = AuthState::AttemptedUnknown;
        self.state.last_credentials = Some(credentials);
    }

    /// Feed a page read; classifies a pending login attempt.
    ///
    /// Returns the new state when this read settled an attempt.
    pub fn observe_read(&mut self, snapshot: &PageSnapshot) -> Option<AuthState> {
        if self.state.auth != AuthState::AttemptedUnknown {
            return None;
        }
        let outcome = self.classify(snapshot);
        info!("Login classified as {} (url {})", outcome, snapshot.url);
        self.state.auth = outcome;
        Some(outcome)
    }

    /// The read meant to classify a pending attempt failed at the gateway.
    ///
    /// An attempt that cannot be confirmed counts as failed.
    pub fn observe_failed_read(&mut self) -> Option<AuthState> {
        if self.state.auth != AuthState::AttemptedUnknown {
            return None;
        }
        warn!("Could not read the page after login; treating the attempt as failed");
        self.state.auth = AuthState::Failed;
        Some(AuthState::Failed)
    }

    /// Decide whether the page shows a successful login
    pub fn classify(&self, snapshot: &PageSnapshot) -> AuthState {
        let text = snapshot.text_content.to_lowercase();
        let url = snapshot.url.to_lowercase();
        let sig = self.signatures.as_ref();

        if shows_failure(sig, &text) && shows_login_form(sig, &text) {
            return AuthState::Failed;
        }
        if shows_success(sig, &text) && url.contains(&sig.overview_url_marker) {
            return AuthState::Authenticated;
        }
        if url.contains(&sig.login_url_marker) && shows_login_form(sig, &text) && !shows_success(sig, &text) {
            return AuthState::Failed;
        }

        match (self.valid_credentials, &self.state.last_credentials) {
            (Some(valid), Some(used)) if valid == used => AuthState::Authenticated,
            _ => AuthState::Failed,
        }
    }

    /// Reason to fail `step` outright because the login already failed
    pub fn cascade_reason(&self, step: &StepText<'_>) -> Option<&'static str> {
        let applies = self.state.auth == AuthState::Failed
            && step.expectation() == Some(Expectation::Success)
            && step.contains_any(&["verify", "check"])
            && step.contains_any(&self.signatures.protected_elements);
        applies.then_some(AUTH_CASCADE_REASON)
    }
}
