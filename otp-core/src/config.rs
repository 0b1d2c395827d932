// File:    config.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: Runtime settings for the daemon and the client.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::InputError;
use crate::frame::{DEFAULT_CHUNK_SIZE, MAX_LENGTH_FIELD_VALUE};
use crate::role::Role;

/// Default number of sessions served concurrently.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Default listen backlog; connections beyond the worker budget wait here.
pub const DEFAULT_BACKLOG: u32 = 5;

/// Default upper bound on a declared payload length (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_LEN: u64 = 64 * 1024 * 1024;

/// Settings for one daemon instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Role served; fixes the transform direction and the announced tag.
    pub role: Role,
    /// Address to listen on.
    pub bind: IpAddr,
    /// Port to listen on. `0` picks an ephemeral port.
    pub port: u16,
    /// Maximum number of sessions in flight.
    pub max_workers: usize,
    /// Largest payload length a peer may declare.
    pub max_payload_len: u64,
    /// Per-call transfer cap of the frame codec.
    pub chunk_size: usize,
    /// Kernel listen backlog.
    pub backlog: u32,
}

impl ServerConfig {
    /// Creates a config with the default limits, listening on all interfaces.
    #[must_use]
    pub const fn new(role: Role, port: u16) -> Self {
        Self {
            role,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port,
            max_workers: DEFAULT_MAX_WORKERS,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            chunk_size: DEFAULT_CHUNK_SIZE,
            backlog: DEFAULT_BACKLOG,
        }
    }

    /// The socket address to bind.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Rejects limits the dispatcher cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Config`] naming the first bad field.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.max_workers == 0 {
            return Err(InputError::Config("max_workers must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(InputError::Config("chunk_size must be at least 1".into()));
        }
        if self.backlog == 0 {
            return Err(InputError::Config("backlog must be at least 1".into()));
        }
        if self.max_payload_len > MAX_LENGTH_FIELD_VALUE {
            return Err(InputError::Config(format!(
                "max_payload_len cannot exceed {MAX_LENGTH_FIELD_VALUE}"
            )));
        }
        Ok(())
    }
}

/// Settings for one client invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Role requested from the server.
    pub role: Role,
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Per-call transfer cap of the frame codec.
    pub chunk_size: usize,
}

impl ClientConfig {
    /// Creates a config targeting `localhost:port`.
    #[must_use]
    pub fn new(role: Role, port: u16) -> Self {
        Self {
            role,
            host: "localhost".to_string(),
            port,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Replaces the target host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}
