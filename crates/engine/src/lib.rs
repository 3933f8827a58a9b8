//! qaflow Engine
//!
//! This crate turns natural-language test steps into browser actions and
//! judges the pages they produce:
//! - Maps each step to abstract actions through an ordered rule table
//! - Executes actions through an [`AutomationGateway`] (Playwright bridge or scripted)
//! - Tracks login state across the steps of a case
//! - Verifies page reads against success and failure signatures
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TestRunner                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  for each TestCase (fresh SessionTracker)                   │
//! │    for each step                                            │
//! │      ActionMapper::map(step, case) -> [AbstractAction]      │
//! │      for each action                                        │
//! │        AutomationGateway::execute(action) -> PageSnapshot   │
//! │        SessionTracker   login click / next page read        │
//! │        VerificationOracle::verify(step, snapshot)           │
//! │      -> StepResult                                          │
//! │    -> CaseResult                                            │
//! │  -> SuiteRun { results, summary }                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod gateway;
pub mod mapper;
pub mod oracle;
pub mod runner;
pub mod session;
pub mod step;

pub use action::{AbstractAction, ClickTarget, DropdownKind, FieldKind};
pub use error::{GatewayError, GatewayResult, MappingError, StepError};
pub use gateway::{AutomationGateway, PageSnapshot, PlaywrightGateway, ScriptedGateway};
pub use mapper::{ActionMapper, MappingRule};
pub use oracle::{Verdict, VerificationOracle};
pub use runner::{write_results, RunnerConfig, SuiteRun, TestRunner};
pub use session::{AuthState, SessionState, SessionTracker, AUTH_CASCADE_REASON};
pub use step::{Expectation, StepText};
