//! Batch engine for parastate
//!
//! This crate wires the storage and concurrency layers into one pipeline:
//! - EngineConfig: `parastate.toml` settings
//! - BatchProcessor: arbitrate, whitelist, finalize and commit a batch

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod config;

pub use batch::{BatchOutcome, BatchProcessor};
pub use config::{EngineConfig, CONFIG_FILE_NAME};
