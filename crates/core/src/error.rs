//! Error types for lanepack.

use thiserror::Error;

/// Result type alias for lanepack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a packing run.
///
/// Only input validation and configuration problems are errors. Items that do
/// not fit, skipped lanes and failed borrow/spill attempts are reported inside
/// the packing result instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed container (non-positive or non-finite extents).
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    /// Malformed item (non-positive dimensions, duplicate id, ...).
    #[error("Invalid item: {0}")]
    InvalidItem(String),

    /// Malformed group definition.
    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    /// Malformed caller-defined zone.
    #[error("Invalid zone: {0}")]
    InvalidZone(String),

    /// Request without any item to pack.
    #[error("Request contains no items")]
    EmptyRequest,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error.
    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns a stable, machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidContainer(_) => "INVALID_CONTAINER",
            Error::InvalidItem(_) => "INVALID_ITEM",
            Error::InvalidGroup(_) => "INVALID_GROUP",
            Error::InvalidZone(_) => "INVALID_ZONE",
            Error::EmptyRequest => "EMPTY_REQUEST",
            Error::ConfigError(_) => "CONFIG_ERROR",
            #[cfg(feature = "serde")]
            Error::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Returns true if the error was caused by the caller's input.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidContainer(_)
                | Error::InvalidItem(_)
                | Error::InvalidGroup(_)
                | Error::InvalidZone(_)
                | Error::EmptyRequest
        )
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::InvalidContainer("x".into()).code(),
            "INVALID_CONTAINER"
        );
        assert_eq!(Error::EmptyRequest.code(), "EMPTY_REQUEST");
        assert!(Error::InvalidItem("bad".into()).is_input_error());
        assert!(!Error::ConfigError("x".into()).is_input_error());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidItem("Item 'A' has non-positive dimensions".into());
        assert_eq!(
            err.to_string(),
            "Invalid item: Item 'A' has non-positive dimensions"
        );
    }
}
