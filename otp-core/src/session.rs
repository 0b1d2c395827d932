// File:    session.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: The per-connection protocol state machine, driven either as responder (daemon) or initiator (client).
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! Per-connection protocol.
//!
//! ```text
//! initiator -> responder   role tag        3 bytes
//! responder -> initiator   own role tag    3 bytes
//! initiator -> responder   length field   10 bytes
//! initiator -> responder   text            n bytes
//! initiator -> responder   key             n bytes
//! responder -> initiator   result          n bytes
//! ```

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_PAYLOAD_LEN;
use crate::crypto;
use crate::error::{InputError, OtpError, Result};
use crate::frame::{self, FrameCodec, LENGTH_FIELD_LEN};
use crate::role::{ROLE_TAG_LEN, Role};

/// Protocol progress of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connection open, nothing exchanged.
    Init,
    /// Both role tags exchanged and matched.
    RoleExchanged,
    /// Payload length known to both sides.
    LengthExchanged,
    /// Text and key transferred.
    PayloadExchanged,
    /// Result delivered.
    Done,
    /// The session failed; the connection has been shut down.
    Aborted,
}

/// One protocol exchange over a connection it owns exclusively.
#[derive(Debug)]
pub struct Session<S> {
    id: Uuid,
    stream: S,
    role: Role,
    codec: FrameCodec,
    max_payload_len: u64,
    state: SessionState,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream. `role` is the role this side announces.
    pub fn new(stream: S, role: Role, codec: FrameCodec) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream,
            role,
            codec,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            state: SessionState::Init,
        }
    }

    /// Sets the largest payload length the responder will accept.
    #[must_use]
    pub fn with_max_payload_len(mut self, max_payload_len: u64) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    /// Identifier used in log lines.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Current protocol state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Gives the stream back, e.g. to inspect what is left on it.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Serves one request as the responder and returns the payload length.
    ///
    /// # Errors
    ///
    /// [`OtpError::RoleMismatch`] if the initiator announced another role,
    /// [`OtpError::InvalidInput`] for a malformed or oversized length or a
    /// payload outside the alphabet, [`OtpError::Transport`] on I/O failure.
    /// The session is [`SessionState::Aborted`] afterwards in every case.
    pub async fn respond(&mut self) -> Result<usize> {
        let result = self.respond_steps().await;
        self.finish(result).await
    }

    /// Sends `text` and `key` as the initiator and returns the responder's result.
    ///
    /// The caller is expected to have validated the inputs; only the first
    /// `text.len()` bytes of `key` are sent.
    ///
    /// # Errors
    ///
    /// [`OtpError::RoleMismatch`] if the responder serves another role,
    /// [`OtpError::InvalidInput`] if the key is shorter than the text,
    /// [`OtpError::Transport`] on I/O failure.
    pub async fn initiate(&mut self, text: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        let result = self.initiate_steps(text, key).await;
        self.finish(result).await
    }

    async fn respond_steps(&mut self) -> Result<usize> {
        let peer_tag: [u8; ROLE_TAG_LEN] = self
            .codec
            .read_field(&mut self.stream, "reading role tag")
            .await?;
        self.codec
            .write_exact(&mut self.stream, self.role.tag(), "writing role tag")
            .await?;
        self.check_peer_tag(&peer_tag)?;
        self.advance(SessionState::RoleExchanged);

        let field: [u8; LENGTH_FIELD_LEN] = self
            .codec
            .read_field(&mut self.stream, "reading length field")
            .await?;
        let length = self.accept_length(frame::decode_length(&field)?)?;
        self.advance(SessionState::LengthExchanged);

        let text = self
            .codec
            .read_exact(&mut self.stream, length, "reading text payload")
            .await?;
        let key = self
            .codec
            .read_exact(&mut self.stream, length, "reading key payload")
            .await?;
        self.advance(SessionState::PayloadExchanged);

        let output = crypto::transform(&text, &key, self.role.direction())?;
        self.codec
            .write_exact(&mut self.stream, &output, "writing transformed payload")
            .await?;
        Ok(length)
    }

    async fn initiate_steps(&mut self, text: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        if key.len() < text.len() {
            return Err(InputError::KeyTooShort {
                text_len: text.len(),
                key_len: key.len(),
            }
            .into());
        }

        self.codec
            .write_exact(&mut self.stream, self.role.tag(), "writing role tag")
            .await?;
        let peer_tag: [u8; ROLE_TAG_LEN] = self
            .codec
            .read_field(&mut self.stream, "reading role tag")
            .await?;
        self.check_peer_tag(&peer_tag)?;
        self.advance(SessionState::RoleExchanged);

        let field = frame::encode_length(text.len() as u64)?;
        self.codec
            .write_exact(&mut self.stream, &field, "writing length field")
            .await?;
        self.advance(SessionState::LengthExchanged);

        self.codec
            .write_exact(&mut self.stream, text, "writing text payload")
            .await?;
        self.codec
            .write_exact(&mut self.stream, &key[..text.len()], "writing key payload")
            .await?;
        self.advance(SessionState::PayloadExchanged);

        self.codec
            .read_exact(&mut self.stream, text.len(), "reading transformed payload")
            .await
    }

    fn check_peer_tag(&self, peer_tag: &[u8; ROLE_TAG_LEN]) -> Result<()> {
        if Role::from_tag(peer_tag) == Some(self.role) {
            return Ok(());
        }
        Err(OtpError::RoleMismatch {
            expected: self.role,
            received: String::from_utf8_lossy(peer_tag).into_owned(),
        })
    }

    fn accept_length(&self, declared: u64) -> Result<usize> {
        let too_large = InputError::PayloadTooLarge {
            declared,
            max: self.max_payload_len,
        };
        if declared > self.max_payload_len {
            return Err(too_large.into());
        }
        usize::try_from(declared).map_err(|_| too_large.into())
    }

    fn advance(&mut self, next: SessionState) {
        debug!("[{}] {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    async fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.advance(SessionState::Done);
                Ok(value)
            }
            Err(e) => {
                self.advance(SessionState::Aborted);
                // The session is already lost; a failed shutdown changes nothing.
                let _ = self.stream.shutdown().await;
                debug!("[{}] aborted ({}): {e}", self.id, e.kind());
                Err(e)
            }
        }
    }
}
