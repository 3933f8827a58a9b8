//! qaflow CLI
//!
//! Command-line front end: run generated test cases in a browser, preview how
//! their steps are interpreted, and re-print stored results.

pub mod commands;
pub mod output;
