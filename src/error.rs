//! Error types for the powerwatch daemon.

use std::fmt;

use thiserror::Error;

/// Primary error type for daemon operations.
#[derive(Error, Debug)]
pub enum PwError {
    // Shared transport errors (bus connection, signal subscription,
    // notification calls). These terminate the loop.
    #[error("{context}: {reason}")]
    Transport {
        context: &'static str,
        reason: String,
    },

    // Per-device property query or watch failure during add/refresh.
    // The record is retained with whatever data it has.
    #[error("device lookup failed for {path}: {reason}")]
    Lookup { path: String, reason: String },

    // Malformed event payload; the event is dropped and the loop continues.
    #[error("malformed bus event: {0}")]
    Protocol(String),

    // Invalid CLI input; rejected before the loop starts.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PwError {
    /// Build a transport error with a short call-site context.
    pub fn transport(context: &'static str, reason: impl fmt::Display) -> Self {
        Self::Transport {
            context,
            reason: reason.to_string(),
        }
    }

    /// Build a lookup error for a specific device path.
    pub fn lookup(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Lookup {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a protocol error for a dropped event.
    pub fn protocol(reason: impl fmt::Display) -> Self {
        Self::Protocol(reason.to_string())
    }

    /// Returns true if the error must terminate the reconciliation loop.
    ///
    /// Per-device failures (`Lookup`) and dropped events (`Protocol`) are
    /// isolated to the device or event they concern; everything else is
    /// escalated.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Config(_))
    }
}

/// Convenience type alias for Results using PwError.
pub type Result<T> = std::result::Result<T, PwError>;
