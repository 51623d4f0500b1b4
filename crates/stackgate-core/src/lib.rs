//! # stackgate-core: Foundational Types
//!
//! Defines the vocabulary shared by every other stackgate crate: the two
//! error channels, the closed classification of input values, and the
//! engine configuration object.
//!
//! ## Two Error Channels
//!
//! A validation run ends in exactly one of two ways:
//!
//! 1. **Terminal**: [`StackError`]. The engine could not reason about the
//!    input at all (empty template, oversize document, unparsable YAML,
//!    unknown schema version, unsafe values, broken schema reference).
//! 2. **Collected**: a possibly empty `Vec<`[`ValidationError`]`>`. The run
//!    completed and these are its findings. Empty means pass.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `stackgate-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigError, EngineConfig};
pub use error::{DocumentKind, ErrorKind, StackError, ValidationError};
pub use types::{class_name, classify, InputType};
