//! # stackgate-cli: Stack Template Pre-Publish Checks
//!
//! The `stackgate` binary finds a repository's stack template, runs it
//! through [`stackgate_engine::StackValidator`], and reports the outcome
//! three ways: console output, an errors log file, and (inside GitHub
//! Actions) step outputs.
//!
//! ## Subcommands
//!
//! - `validate`: Discover, validate, and report on a stack template
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers live here.
//! - Validation semantics belong to the engine crate. This crate only moves
//!   files in and results out.
//! - Exit status: 0 passed, 1 findings, 2 could not validate.

pub mod discover;
pub mod validate;
