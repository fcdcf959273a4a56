//! Byte formats for exchanging records.
//!
//! Serialization lives here, separate from the cache and importer that
//! produce and consume the records.
//!
//! # Module Structure
//!
//! - `transitions`: offset-indexed transition log

pub mod transitions;

pub use transitions::{decode, encode, TransitionLogError};
