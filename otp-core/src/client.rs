// File:    client.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: The initiating side: validates text and key locally, then runs one session against a daemon.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

use log::debug;
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::crypto;
use crate::error::{OtpError, Result};
use crate::frame::FrameCodec;
use crate::session::Session;

/// Sends text and key to a daemon and returns the transformed text.
#[derive(Debug, Clone)]
pub struct CipherClient {
    config: ClientConfig,
}

impl CipherClient {
    /// Creates a client for the given target and role.
    #[must_use]
    pub const fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// The client's settings.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validates the inputs, connects, and runs one session as initiator.
    ///
    /// Nothing touches the network unless `text` and `key` pass
    /// [`crypto::check_inputs`]. No step is retried.
    ///
    /// # Errors
    ///
    /// [`OtpError::InvalidInput`] before connecting, [`OtpError::RoleMismatch`]
    /// if the daemon serves the other role, [`OtpError::Transport`] on any
    /// connection failure.
    pub async fn run(&self, text: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        crypto::check_inputs(text, key)?;

        let target = (self.config.host.as_str(), self.config.port);
        let stream = TcpStream::connect(target)
            .await
            .map_err(|e| OtpError::transport("connecting to server", e))?;
        debug!(
            "connected to {}:{} as {}",
            self.config.host, self.config.port, self.config.role
        );

        let codec = FrameCodec::new(self.config.chunk_size);
        let mut session = Session::new(stream, self.config.role, codec);
        session.initiate(text, key).await
    }
}
