// File:    keygen.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: Provides functionality for generating one-time pad keys over the 27-symbol alphabet.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

use rand::{TryRngCore, rngs::OsRng};
use std::io::Write;

use crate::crypto::{ALPHABET_LEN, symbol_at};

/// Random bytes at or above this value are discarded so each symbol is equally likely.
const REJECTION_THRESHOLD: u8 = ALPHABET_LEN * 9;

/// Generates a key of `length` symbols drawn uniformly from `A-Z` and space.
///
/// # Errors
///
/// This function will return an error if the operating system RNG fails.
pub fn generate_key(length: usize) -> std::io::Result<Vec<u8>> {
    let mut rng = OsRng;
    let mut key = Vec::with_capacity(length);
    let mut buffer = [0u8; 256];

    while key.len() < length {
        // Use the failable `try_fill_bytes` and map the error to an `io::Error`.
        rng.try_fill_bytes(&mut buffer)
            .map_err(std::io::Error::other)?;
        key.extend(
            buffer
                .iter()
                .filter(|&&b| b < REJECTION_THRESHOLD)
                .map(|&b| symbol_at(b))
                .take(length - key.len()),
        );
    }

    Ok(key)
}

/// Writes a freshly generated key followed by a newline.
///
/// # Errors
///
/// This function will return an error if the RNG fails or the writer cannot be written to.
pub fn write_key<W: Write>(mut writer: W, length: usize) -> std::io::Result<()> {
    let mut key = generate_key(length)?;
    key.push(b'\n');
    writer.write_all(&key)?;
    writer.flush()
}
