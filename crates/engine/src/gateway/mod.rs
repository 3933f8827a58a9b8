//! Browser automation gateways
//!
//! A gateway executes one [`AbstractAction`] at a time against an exclusive
//! browser session and returns a snapshot of the page afterwards. Failures are
//! ordinary values; only launching the session is fatal.

mod playwright;
mod scripted;

pub use playwright::{bridge_script, PlaywrightGateway};
pub use scripted::{ActionLog, ScriptedGateway};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::AbstractAction;
use crate::error::GatewayResult;

/// Page state observed after an action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Visible text of the page body
    #[serde(rename = "text", alias = "textContent", default)]
    pub text_content: String,
    #[serde(default)]
    pub url: String,
}

impl PageSnapshot {
    pub fn new(text_content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text_content: text_content.into(),
            url: url.into(),
        }
    }
}

/// Executes abstract actions against a live browser session
#[async_trait]
pub trait AutomationGateway: Send {
    /// Execute `action` once and snapshot the resulting page
    async fn execute(&mut self, action: &AbstractAction) -> GatewayResult<PageSnapshot>;

    /// Release the browser session; further calls fail with `Closed`
    async fn close(&mut self) -> GatewayResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<G: AutomationGateway + ?Sized> AutomationGateway for Box<G> {
    async fn execute(&mut self, action: &AbstractAction) -> GatewayResult<PageSnapshot> {
        (**self).execute(action).await
    }

    async fn close(&mut self) -> GatewayResult<()> {
        (**self).close().await
    }
}
