//! Error types for the Tessera checker.

use alloc::string::String;
use core::fmt;

/// Result type alias for Tessera operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types raised while configuring or running a check.
///
/// Everything except `Interrupted` is a configuration error: it is surfaced
/// immediately and never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid checker configuration.
    InvalidConfiguration {
        message: String,
    },
    /// The requested combination of statistics is not supported.
    UnsupportedRequirements {
        bits: u8,
    },
    /// Snapshot stride does not match the configured statistics.
    StrideMismatch {
        expected: usize,
        got: usize,
    },
    /// A hierarchy is ragged or empty.
    MalformedHierarchy {
        column: usize,
        message: String,
    },
    /// A data value has no entry in its column's hierarchy.
    MissingHierarchyValue {
        column: usize,
        row: usize,
        value: u32,
    },
    /// A lattice node does not fit the configured hierarchies.
    InvalidNode {
        message: String,
    },
    /// A snapshot could not be decoded or references unknown ids.
    InvalidSnapshot {
        message: String,
    },
    /// The check was cancelled through its interrupt flag.
    Interrupted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            Error::UnsupportedRequirements { bits } => {
                write!(f, "Unsupported statistics requirements: {:#05b}", bits)
            }
            Error::StrideMismatch { expected, got } => {
                write!(
                    f,
                    "Snapshot stride mismatch: expected {}, got {}",
                    expected, got
                )
            }
            Error::MalformedHierarchy { column, message } => {
                write!(f, "Malformed hierarchy for column {}: {}", column, message)
            }
            Error::MissingHierarchyValue { column, row, value } => {
                write!(
                    f,
                    "Value {} in row {} has no entry in the hierarchy of column {}",
                    value, row, column
                )
            }
            Error::InvalidNode { message } => {
                write!(f, "Invalid node: {}", message)
            }
            Error::InvalidSnapshot { message } => {
                write!(f, "Invalid snapshot: {}", message)
            }
            Error::Interrupted => write!(f, "Check interrupted"),
        }
    }
}

impl Error {
    /// Creates an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Creates an unsupported requirements error.
    pub fn unsupported_requirements(bits: u8) -> Self {
        Error::UnsupportedRequirements { bits }
    }

    /// Creates a stride mismatch error.
    pub fn stride_mismatch(expected: usize, got: usize) -> Self {
        Error::StrideMismatch { expected, got }
    }

    /// Creates a malformed hierarchy error.
    pub fn malformed_hierarchy(column: usize, message: impl Into<String>) -> Self {
        Error::MalformedHierarchy {
            column,
            message: message.into(),
        }
    }

    /// Creates a missing hierarchy value error.
    pub fn missing_hierarchy_value(column: usize, row: usize, value: u32) -> Self {
        Error::MissingHierarchyValue { column, row, value }
    }

    /// Creates an invalid node error.
    pub fn invalid_node(message: impl Into<String>) -> Self {
        Error::InvalidNode {
            message: message.into(),
        }
    }

    /// Creates an invalid snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Error::InvalidSnapshot {
            message: message.into(),
        }
    }

    /// Returns true if this error came from cooperative cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }
}
