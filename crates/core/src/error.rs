//! Error types for moth-hid-core.

use crate::record::Field;
use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No attached device matched the search.
    #[error("device not found: {0}")]
    NotFound(String),

    /// The device answered with something other than what the protocol expects.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A requested configuration value was rejected before transmission.
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    /// HID transport failure, passed through as reported by hidapi.
    #[error(transparent)]
    Hid(#[from] hidapi::HidError),
}

/// Malformed or unexpected device responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("configuration message was {actual} bytes, expected {expected}")]
    WrongLength { expected: usize, actual: usize },

    #[error("device responded with tag 0x{actual:02X}, expected 0x{expected:02X}")]
    UnexpectedTag { expected: u8, actual: u8 },
}

/// Caller-supplied configuration values that violate a device constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The value is not an integer of the field's wire type.
    #[error("{field} must be an integer of type {ty}, got {value}")]
    TypeMismatch {
        field: Field,
        ty: &'static str,
        value: String,
    },

    /// The value is an integer but outside the field's allowed set.
    #[error("{field} = {value} is out of range: {reason}")]
    Range {
        field: Field,
        value: i64,
        reason: String,
    },
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
