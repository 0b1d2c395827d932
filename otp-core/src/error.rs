// File:    error.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: Error types shared by the cipher, the wire codec, the session state machine and the dispatcher.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! Error types for the OTP service.

use std::fmt;
use std::io;

use crate::role::Role;

/// Convenience alias used throughout the crate.
pub type Result<T, E = OtpError> = std::result::Result<T, E>;

/// Identifies which of the two payloads of a session an input error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// The plaintext (or ciphertext, when decoding).
    Text,
    /// The one-time pad key.
    Key,
}

impl fmt::Display for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Key => f.write_str("key"),
        }
    }
}

/// Reasons a text, key or declared length is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// The key has fewer symbols than the text it must cover.
    #[error("key is too short: {key_len} symbols for a text of {text_len}")]
    KeyTooShort {
        /// Length of the text.
        text_len: usize,
        /// Length of the key.
        key_len: usize,
    },

    /// A byte outside `A-Z` and space was found.
    #[error("{payload} has invalid character {byte:#04x} at position {position}")]
    InvalidCharacter {
        /// Payload containing the byte.
        payload: PayloadSource,
        /// Zero-based offset of the byte.
        position: usize,
        /// The offending byte.
        byte: u8,
    },

    /// The 10-byte length field did not hold a decimal number.
    #[error("malformed length field: {0:?}")]
    MalformedLength(String),

    /// The peer declared a payload larger than the configured limit.
    #[error("declared payload length {declared} exceeds the limit of {max}")]
    PayloadTooLarge {
        /// Length announced by the peer.
        declared: u64,
        /// Configured maximum.
        max: u64,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors produced by the OTP service.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    /// Local or peer-supplied data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// The peer announced a role that does not match ours.
    #[error("role mismatch: expected {} ({expected}), peer announced {received:?}", .expected.service_name())]
    RoleMismatch {
        /// The role this side requires from its peer.
        expected: Role,
        /// The tag the peer sent, lossily decoded.
        received: String,
    },

    /// An I/O error on the connection.
    #[error("transport failure while {operation}: {source}")]
    Transport {
        /// The protocol step that failed.
        operation: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The worker budget bookkeeping was violated.
    #[error("resource accounting violated: {0}")]
    ResourceExhaustion(String),
}

impl OtpError {
    /// Wraps an I/O error with the name of the operation that produced it.
    pub fn transport(operation: &'static str, source: io::Error) -> Self {
        Self::Transport { operation, source }
    }

    /// Process exit code for this error: 2 for a rejected role, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::RoleMismatch { .. } => 2,
            _ => 1,
        }
    }

    /// Short, stable name of the error kind, used in log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid-input",
            Self::RoleMismatch { .. } => "role-mismatch",
            Self::Transport { .. } => "transport-failure",
            Self::ResourceExhaustion(_) => "resource-exhaustion",
        }
    }
}
