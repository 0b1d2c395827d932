// File:    frame.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: Exact-length payload transfer in bounded chunks and the fixed-width ASCII length field.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! Wire codec.
//!
//! ```text
//! ROLE TAG      [3 bytes ASCII: "enc" | "dec"]
//! LENGTH FIELD  [10 bytes ASCII decimal, NUL padded]
//! PAYLOAD       [n bytes, sent in chunks of at most `chunk_size`]
//! ```

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{InputError, OtpError, Result};

/// Width of the length field on the wire.
pub const LENGTH_FIELD_LEN: usize = 10;

/// Largest value the length field can carry.
pub const MAX_LENGTH_FIELD_VALUE: u64 = 9_999_999_999;

/// Default per-call transfer cap.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Encodes `length` as decimal digits followed by NUL padding.
///
/// # Errors
///
/// Returns [`InputError::PayloadTooLarge`] if the value needs more than ten digits.
pub fn encode_length(length: u64) -> Result<[u8; LENGTH_FIELD_LEN], InputError> {
    if length > MAX_LENGTH_FIELD_VALUE {
        return Err(InputError::PayloadTooLarge {
            declared: length,
            max: MAX_LENGTH_FIELD_VALUE,
        });
    }
    let digits = length.to_string();
    let mut field = [0u8; LENGTH_FIELD_LEN];
    field[..digits.len()].copy_from_slice(digits.as_bytes());
    Ok(field)
}

/// Parses a length field: decimal digits with optional NUL or space padding.
///
/// # Errors
///
/// Returns [`InputError::MalformedLength`] if no digits are present or any
/// other byte appears between the padding.
pub fn decode_length(field: &[u8; LENGTH_FIELD_LEN]) -> Result<u64, InputError> {
    let is_pad = |b: &u8| *b == 0 || *b == b' ';
    let start = field.iter().position(|b| !is_pad(b)).unwrap_or(field.len());
    let end = field.iter().rposition(|b| !is_pad(b)).map_or(start, |i| i + 1);
    let digits = &field[start..end];

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(InputError::MalformedLength(
            String::from_utf8_lossy(field).into_owned(),
        ));
    }
    Ok(digits
        .iter()
        .fold(0u64, |acc, d| acc * 10 + u64::from(d - b'0')))
}

/// Moves whole payloads over a byte stream, at most `chunk_size` bytes per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    chunk_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl FrameCodec {
    /// Creates a codec with the given per-call cap. A cap of zero is raised to one.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// The per-call transfer cap.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Writes every byte of `payload`, looping over partial writes, then flushes.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Transport`] tagged with `operation` on the first
    /// failed or zero-length write. Nothing is retried.
    pub async fn write_exact<W>(
        &self,
        writer: &mut W,
        payload: &[u8],
        operation: &'static str,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut sent = 0;
        while sent < payload.len() {
            let end = payload.len().min(sent + self.chunk_size);
            let n = writer
                .write(&payload[sent..end])
                .await
                .map_err(|e| OtpError::transport(operation, e))?;
            if n == 0 {
                return Err(OtpError::transport(
                    operation,
                    io::Error::new(io::ErrorKind::WriteZero, "connection closed by peer"),
                ));
            }
            sent += n;
        }
        writer
            .flush()
            .await
            .map_err(|e| OtpError::transport(operation, e))
    }

    /// Reads exactly `length` bytes, looping over partial reads.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Transport`] tagged with `operation` on a read error
    /// or if the peer closes the stream early.
    pub async fn read_exact<R>(
        &self,
        reader: &mut R,
        length: usize,
        operation: &'static str,
    ) -> Result<Vec<u8>>
    where
        R: AsyncRead + Unpin,
    {
        let mut payload = vec![0u8; length];
        let mut received = 0;
        while received < length {
            let end = length.min(received + self.chunk_size);
            let n = reader
                .read(&mut payload[received..end])
                .await
                .map_err(|e| OtpError::transport(operation, e))?;
            if n == 0 {
                return Err(OtpError::transport(
                    operation,
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("connection closed after {received} of {length} bytes"),
                    ),
                ));
            }
            received += n;
        }
        Ok(payload)
    }

    /// Reads a fixed-size field of `N` bytes.
    ///
    /// # Errors
    ///
    /// See [`FrameCodec::read_exact`].
    pub async fn read_field<R, const N: usize>(
        &self,
        reader: &mut R,
        operation: &'static str,
    ) -> Result<[u8; N]>
    where
        R: AsyncRead + Unpin,
    {
        let mut field = [0u8; N];
        reader
            .read_exact(&mut field)
            .await
            .map_err(|e| OtpError::transport(operation, e))?;
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_field_is_nul_padded() {
        let field = encode_length(11).unwrap();
        assert_eq!(&field, b"11\0\0\0\0\0\0\0\0");
        assert_eq!(decode_length(&field).unwrap(), 11);
    }

    #[test]
    fn length_field_accepts_space_padding() {
        assert_eq!(decode_length(b"  5000    ").unwrap(), 5000);
        assert_eq!(decode_length(b"9999999999").unwrap(), MAX_LENGTH_FIELD_VALUE);
        assert_eq!(decode_length(b"0\0\0\0\0\0\0\0\0\0").unwrap(), 0);
    }

    #[test]
    fn length_field_rejects_garbage() {
        assert!(decode_length(b"\0\0\0\0\0\0\0\0\0\0").is_err());
        assert!(decode_length(b"12a4\0\0\0\0\0\0").is_err());
        assert!(decode_length(b"-5\0\0\0\0\0\0\0\0").is_err());
        assert!(decode_length(b"1 2\0\0\0\0\0\0\0").is_err());
    }

    #[test]
    fn length_field_rejects_eleven_digits() {
        assert!(matches!(
            encode_length(10_000_000_000),
            Err(InputError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn zero_chunk_size_is_raised() {
        assert_eq!(FrameCodec::new(0).chunk_size(), 1);
    }

    #[tokio::test]
    async fn chunked_transfer_is_byte_exact() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let codec = FrameCodec::new(1024);
        // A 300-byte pipe forces partial reads and writes on both ends.
        let (mut a, mut b) = tokio::io::duplex(300);

        let sent = payload.clone();
        let writer = tokio::spawn(async move { codec.write_exact(&mut a, &sent, "test write").await });
        let received = codec.read_exact(&mut b, 5000, "test read").await.unwrap();
        writer.await.unwrap().unwrap();

        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn early_close_is_a_transport_failure() {
        let codec = FrameCodec::default();
        let (mut a, mut b) = tokio::io::duplex(64);
        codec.write_exact(&mut a, b"ABC", "test write").await.unwrap();
        drop(a);

        let err = codec.read_exact(&mut b, 10, "reading text payload").await.unwrap_err();
        assert!(matches!(
            err,
            OtpError::Transport { operation: "reading text payload", .. }
        ));
    }
}
