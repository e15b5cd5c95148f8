//! Transaction scripts for the configuration-access fabric.
//!
//! A script describes a fabric topology, the requests to push through it and
//! the responses and register contents expected afterwards. [`parse_script`]
//! reads the text form and [`run_script`] drives a cycle-level fabric with it.

/// Script syntax and validation.
pub mod script;
pub use script::{
    format_packet, parse_script, RegisterExpectation, Script, ScriptError, StatusDrive,
    Transaction, DEFAULT_MAX_CYCLES,
};

/// Script execution and result reporting.
pub mod runner;
pub use runner::{format_event, run_script, CheckResult, RunOptions, RunReport, RunSummary};

/// Stderr backend for the `log` facade.
pub mod logger;

#[cfg(test)]
use tempfile as _;
