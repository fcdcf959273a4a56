//! Error types for parastate
//!
//! Two classes of failure flow through the system:
//!
//! - **Recoverable** conditions describe the data: a missing parent directory,
//!   deleting a value that does not exist, a bounded counter leaving its range.
//!   They are reported per record and never abort a batch.
//! - **Invariant** violations describe a broken caller contract, such as a
//!   read-only record reaching a merge chain. They abort the current batch.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for parastate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for parastate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Deleting or resolving a value that does not exist
    #[error("value does not exist: {0}")]
    ValueNotFound(String),

    /// Writing below a directory that has not been created
    #[error("parent path doesn't exist: {0}")]
    ParentNotFound(String),

    /// A bounded numeric exceeded its maximum
    #[error("overflow: {0}")]
    Overflow(String),

    /// A bounded numeric fell below its minimum
    #[error("underflow: {0}")]
    Underflow(String),

    /// Two values of different variants were combined
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Variant of the receiving value
        expected: &'static str,
        /// Variant of the incoming value
        found: &'static str,
    },

    /// Malformed path
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Encoding or decoding failure
    #[error("codec error: {0}")]
    Codec(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// Internal invariant violated by the caller; aborts the batch
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Create a new invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }

    /// Create a new codec error
    pub fn codec(msg: impl Into<String>) -> Self {
        Error::Codec(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether this error must abort the current batch
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }

    /// Whether this error is a numeric bound violation
    pub fn is_out_of_limits(&self) -> bool {
        matches!(self, Error::Overflow(_) | Error::Underflow(_))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_value_not_found() {
        let err = Error::ValueNotFound("/a/b".to_string());
        let msg = err.to_string();
        assert!(msg.contains("value does not exist"));
        assert!(msg.contains("/a/b"));
    }

    #[test]
    fn test_error_display_parent_not_found() {
        let err = Error::ParentNotFound("/a/".to_string());
        assert!(err.to_string().contains("parent path doesn't exist"));
    }

    #[test]
    fn test_error_display_type_mismatch() {
        let err = Error::TypeMismatch {
            expected: "U64",
            found: "Bytes",
        };
        let msg = err.to_string();
        assert!(msg.contains("U64"));
        assert!(msg.contains("Bytes"));
    }

    #[test]
    fn test_only_invariant_is_fatal() {
        assert!(Error::invariant("zero-touch record").is_fatal());
        assert!(!Error::Overflow("x".into()).is_fatal());
        assert!(!Error::ParentNotFound("x".into()).is_fatal());
        assert!(!Error::codec("x").is_fatal());
    }

    #[test]
    fn test_out_of_limits() {
        assert!(Error::Overflow("x".into()).is_out_of_limits());
        assert!(Error::Underflow("x".into()).is_out_of_limits());
        assert!(!Error::invariant("x").is_out_of_limits());
    }

    #[test]
    fn test_error_from_bincode() {
        let invalid_data = vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<String> = bincode::deserialize(&invalid_data).map_err(|e| e.into());
        assert!(matches!(result, Err(Error::Codec(_))));
    }
}
