//! In-memory gateway driven by canned outcomes

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use super::{AutomationGateway, PageSnapshot};
use crate::action::AbstractAction;
use crate::error::{GatewayError, GatewayResult};

type Responder = Box<dyn FnMut(&AbstractAction) -> GatewayResult<PageSnapshot> + Send>;

/// Shared record of the actions a [`ScriptedGateway`] received
#[derive(Debug, Clone, Default)]
pub struct ActionLog(Arc<Mutex<Vec<AbstractAction>>>);

impl ActionLog {
    pub fn actions(&self) -> Vec<AbstractAction> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn push(&self, action: AbstractAction) {
        self.0.lock().push(action);
    }
}

/// Gateway that answers from a responder closure instead of a browser
pub struct ScriptedGateway {
    responder: Responder,
    log: ActionLog,
    closed: bool,
}

impl ScriptedGateway {
    pub fn new<F>(responder: F) -> Self
    where
        F: FnMut(&AbstractAction) -> GatewayResult<PageSnapshot> + Send + 'static,
    {
        Self {
            responder: Box::new(responder),
            log: ActionLog::default(),
            closed: false,
        }
    }

    /// Every action succeeds with an empty page
    pub fn blank() -> Self {
        Self::new(|_| Ok(PageSnapshot::default()))
    }

    /// Every action succeeds and shows the same page
    pub fn with_page(text_content: impl Into<String>, url: impl Into<String>) -> Self {
        let page = PageSnapshot::new(text_content, url);
        Self::new(move |_| Ok(page.clone()))
    }

    /// Outcomes are consumed in order; once exhausted, actions see an empty page
    pub fn queued<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = GatewayResult<PageSnapshot>>,
    {
        let mut queue: VecDeque<_> = outcomes.into_iter().collect();
        Self::new(move |_| queue.pop_front().unwrap_or_else(|| Ok(PageSnapshot::default())))
    }

    /// Handle onto the actions executed so far
    pub fn log(&self) -> ActionLog {
        self.log.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl AutomationGateway for ScriptedGateway {
    async fn execute(&mut self, action: &AbstractAction) -> GatewayResult<PageSnapshot> {
        if self.closed {
            return Err(GatewayError::Closed);
        }
        debug!("scripted {}", action);
        self.log.push(action.clone());
        (self.responder)(action)
    }

    async fn close(&mut self) -> GatewayResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queued_outcomes_then_blank() {
        let mut gateway = ScriptedGateway::queued(vec![
            Ok(PageSnapshot::new("first", "https://a.test/")),
            Err(GatewayError::ActionFailed {
                action: "click".to_string(),
                reason: "element not found".to_string(),
            }),
        ]);
        let log = gateway.log();

        let first = gateway.execute(&AbstractAction::ReadPage).await.unwrap();
        assert_eq!(first.text_content, "first");
        assert!(gateway.execute(&AbstractAction::ReadPage).await.is_err());
        let third = gateway.execute(&AbstractAction::ReadPage).await.unwrap();
        assert_eq!(third, PageSnapshot::default());
        assert_eq!(log.len(), 3);
    }

    #[tokio::test]
    async fn test_closed_gateway_rejects_actions() {
        let mut gateway = ScriptedGateway::blank();
        gateway.close().await.unwrap();
        assert!(gateway.is_closed());
        let err = gateway.execute(&AbstractAction::ReadPage).await.unwrap_err();
        assert!(matches!(err, GatewayError::Closed));
        assert!(gateway.log().is_empty());
    }
}
