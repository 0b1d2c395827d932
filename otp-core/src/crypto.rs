// File:    crypto.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: Handles the core cryptographic operation, a one-time pad over the 27-symbol alphabet (A-Z and space).
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! This module contains the core cryptographic operations.

use crate::error::{InputError, PayloadSource};

/// The 27 symbols a payload may contain, in index order.
pub const ALPHABET: &[u8; 27] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ ";

/// Number of symbols in [`ALPHABET`].
pub const ALPHABET_LEN: u8 = 27;

/// Direction of the pad transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `(t + k) mod 27`
    Encode,
    /// `(t - k + 27) mod 27`
    Decode,
}

/// Maps a symbol to its index: `A..Z` to `0..25`, space to `26`.
#[must_use]
pub const fn symbol_index(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b' ' => Some(26),
        _ => None,
    }
}

/// Inverse of [`symbol_index`]. Indices are taken modulo 27.
#[must_use]
pub const fn symbol_at(index: u8) -> u8 {
    ALPHABET[(index % ALPHABET_LEN) as usize]
}

/// Checks that every byte of `payload` belongs to the alphabet.
///
/// # Errors
///
/// Returns [`InputError::InvalidCharacter`] for the first offending byte.
pub fn validate_payload(payload: &[u8], source: PayloadSource) -> Result<(), InputError> {
    match payload.iter().position(|&b| symbol_index(b).is_none()) {
        Some(position) => Err(InputError::InvalidCharacter {
            payload: source,
            position,
            byte: payload[position],
        }),
        None => Ok(()),
    }
}

/// Validates a text/key pair before anything is sent.
///
/// Checks run in a fixed order: key length, then the text, then the whole key
/// (including the part beyond the text length, which is never used).
///
/// # Errors
///
/// Returns the first [`InputError`] found.
pub fn check_inputs(text: &[u8], key: &[u8]) -> Result<(), InputError> {
    if key.len() < text.len() {
        return Err(InputError::KeyTooShort {
            text_len: text.len(),
            key_len: key.len(),
        });
    }
    validate_payload(text, PayloadSource::Text)?;
    validate_payload(key, PayloadSource::Key)
}

/// Applies the pad to `text` using the first `text.len()` symbols of `key`.
///
/// The output has the same length as `text` and contains only alphabet
/// symbols. Decoding with the key used to encode restores the text exactly.
///
/// # Errors
///
/// Returns an [`InputError`] if the key is shorter than the text or either
/// payload contains a byte outside the alphabet.
pub fn transform(text: &[u8], key: &[u8], direction: Direction) -> Result<Vec<u8>, InputError> {
    if key.len() < text.len() {
        return Err(InputError::KeyTooShort {
            text_len: text.len(),
            key_len: key.len(),
        });
    }
    let key = &key[..text.len()];
    validate_payload(text, PayloadSource::Text)?;
    validate_payload(key, PayloadSource::Key)?;

    Ok(text
        .iter()
        .zip(key.iter())
        .map(|(&t, &k)| {
            // Both bytes were validated above.
            let t = symbol_index(t).unwrap_or(0);
            let k = symbol_index(k).unwrap_or(0);
            match direction {
                Direction::Encode => symbol_at(t + k),
                Direction::Decode => symbol_at(t + ALPHABET_LEN - k),
            }
        })
        .collect())
}
