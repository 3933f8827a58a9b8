//! Abstract browser actions produced by the mapper
//!
//! Actions name semantic targets (`username`, `login-button`, ...) rather than
//! selectors; the gateway decides how a target is located on the page.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Input field addressed by a fill action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Username,
    Password,
}

/// Element addressed by a click action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClickTarget {
    LoginButton,
    OpenAccountButton,
    SubmitButton,
    /// Button or link identified by its visible label
    Labeled(String),
}

/// Dropdown addressed by a select action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropdownKind {
    AccountType,
    SourceAccount,
}

/// One browser operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AbstractAction {
    Navigate { url: String },
    FillField { field: FieldKind, value: String },
    Click { target: ClickTarget },
    SelectOption { dropdown: DropdownKind, value: String },
    ReadPage,
}

impl AbstractAction {
    /// Action name used at the gateway boundary
    pub fn name(&self) -> &'static str {
        match self {
            AbstractAction::Navigate { .. } => "navigate",
            AbstractAction::FillField { .. } => "fill_field",
            AbstractAction::Click { .. } => "click",
            AbstractAction::SelectOption { .. } => "select_option",
            AbstractAction::ReadPage => "read_page",
        }
    }

    pub fn is_login_click(&self) -> bool {
        matches!(
            self,
            AbstractAction::Click {
                target: ClickTarget::LoginButton
            }
        )
    }

    pub fn is_read(&self) -> bool {
        matches!(self, AbstractAction::ReadPage)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Username => write!(f, "username"),
            FieldKind::Password => write!(f, "password"),
        }
    }
}

impl fmt::Display for ClickTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickTarget::LoginButton => write!(f, "login-button"),
            ClickTarget::OpenAccountButton => write!(f, "open-account-button"),
            ClickTarget::SubmitButton => write!(f, "submit-button"),
            ClickTarget::Labeled(label) => write!(f, "\"{}\"", label),
        }
    }
}

impl fmt::Display for DropdownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropdownKind::AccountType => write!(f, "account-type"),
            DropdownKind::SourceAccount => write!(f, "source-account"),
        }
    }
}

impl fmt::Display for AbstractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbstractAction::Navigate { url } => write!(f, "navigate {}", url),
            // Never echo passwords into logs or plans
            AbstractAction::FillField {
                field: FieldKind::Password,
                ..
            } => write!(f, "fill password ********"),
            AbstractAction::FillField { field, value } => write!(f, "fill {} \"{}\"", field, value),
            AbstractAction::Click { target } => write!(f, "click {}", target),
            AbstractAction::SelectOption { dropdown, value } => {
                write!(f, "select {} \"{}\"", dropdown, value)
            }
            AbstractAction::ReadPage => write!(f, "read page"),
        }
    }
}
