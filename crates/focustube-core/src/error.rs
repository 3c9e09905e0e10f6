//! Core error types.
//!
//! The decision and timeline paths are total and never produce these. They
//! only surface from operations that change settings (PIN handling, unblock
//! grants, weekly sessions, list edits).

use thiserror::Error;

use crate::strict::MIN_PIN_LENGTH;

/// Errors raised by settings-changing operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// PIN is empty.
    #[error("PIN cannot be empty")]
    PinEmpty,

    /// PIN is shorter than the minimum length.
    #[error("PIN must be at least {} characters", MIN_PIN_LENGTH)]
    PinTooShort,

    /// PIN hashing failed.
    #[error("failed to hash PIN: {0}")]
    HashingFailed(String),

    /// Stored PIN hash could not be parsed.
    #[error("failed to verify PIN: {0}")]
    VerificationFailed(String),

    /// Strict mode is on but no PIN has been stored.
    #[error("no PIN is set")]
    PinNotSet,

    /// The supplied PIN does not match the stored hash.
    #[error("PIN does not match")]
    PinMismatch,

    /// Temporary unblock requested while strict mode is active.
    #[error("temporary unblock is disabled while strict mode is active")]
    StrictModeActive,

    /// A weekly session cannot be started right now.
    #[error("weekly session unavailable: {0}")]
    WeeklySessionUnavailable(String),

    /// Input could not be normalized to a hostname.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// Input is not a recognizable whitelist entry.
    #[error("invalid whitelist entry: {0}")]
    InvalidWhitelistEntry(String),

    /// Interval definition is malformed.
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    /// Settings JSON could not be read.
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
