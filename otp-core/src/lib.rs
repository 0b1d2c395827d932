// File:    lib.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: The main library crate for otp-core, orchestrating the cipher, the wire protocol and the concurrent server.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! # OTP Core Library
//!
//! This library provides the one-time pad cipher service: the transform over
//! the 27-symbol alphabet, the wire codec, the per-connection session protocol,
//! the bounded connection dispatcher used by the daemon and the client used by
//! the command-line tools.

/// Client side of the protocol.
pub mod client;
/// Settings for the daemon and the client.
pub mod config;
/// Cryptographic operations for encoding and decoding.
pub mod crypto;
/// Accepts connections under a bounded worker budget.
pub mod dispatcher;
/// Error types.
pub mod error;
/// Wire codec: exact-length transfers and the length field.
pub mod frame;
/// Utilities for generating new one-time pad keys.
pub mod keygen;
/// Service roles and their handshake tags.
pub mod role;
/// The per-connection protocol state machine.
pub mod session;

pub use client::CipherClient;
pub use config::{ClientConfig, ServerConfig};
pub use crypto::{Direction, transform};
pub use dispatcher::{Dispatcher, WorkerBudget};
pub use error::{InputError, OtpError, PayloadSource, Result};
pub use role::Role;
pub use session::{Session, SessionState};
