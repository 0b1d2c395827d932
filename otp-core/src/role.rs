// File:    role.rs
// Author:  apezoo
// Date:    2026-10-16
//
// Description: The two service roles (encode and decode), their handshake tags and transform directions.
//
// License:
// This project is licensed under the terms of the GNU AGPLv3 license.
// See the LICENSE.md file in the project root for full license information.

//! Service roles and the three-byte tags exchanged in the handshake.

use std::fmt;
use std::str::FromStr;

use crate::crypto::Direction;

/// Width of a role tag on the wire.
pub const ROLE_TAG_LEN: usize = 3;

/// Which transform a client/server pair performs.
///
/// A client only talks to a server of the same role: `enc` clients to the
/// encoding daemon, `dec` clients to the decoding daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Encoding service (`enc`).
    Enc,
    /// Decoding service (`dec`).
    Dec,
}

impl Role {
    /// The tag this role announces during the handshake.
    #[must_use]
    pub const fn tag(self) -> &'static [u8; ROLE_TAG_LEN] {
        match self {
            Self::Enc => b"enc",
            Self::Dec => b"dec",
        }
    }

    /// Looks up the role announced by a received tag.
    #[must_use]
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"enc" => Some(Self::Enc),
            b"dec" => Some(Self::Dec),
            _ => None,
        }
    }

    /// Transform direction performed by a server of this role.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Enc => Direction::Encode,
            Self::Dec => Direction::Decode,
        }
    }

    /// Name of the daemon serving this role, as shown to users.
    #[must_use]
    pub const fn service_name(self) -> &'static str {
        match self {
            Self::Enc => "otp_enc_d",
            Self::Dec => "otp_dec_d",
        }
    }

    /// What the text payload is called for this role in user-facing messages.
    #[must_use]
    pub const fn text_label(self) -> &'static str {
        match self {
            Self::Enc => "plaintext",
            Self::Dec => "ciphertext",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Enc => "enc",
            Self::Dec => "dec",
        })
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enc" | "encode" => Ok(Self::Enc),
            "dec" | "decode" => Ok(Self::Dec),
            other => Err(format!("unknown role '{other}', expected 'enc' or 'dec'")),
        }
    }
}
