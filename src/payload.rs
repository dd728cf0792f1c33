//! Per-hop payload framing.
//!
//! A payload on the wire is `bigsize(length) || payload || hmac`, except for
//! the legacy realm-0 format, which is a fixed 65-byte frame (`0x00` marker
//! byte, 32 bytes of data, no explicit length prefix) kept for backward
//! compatibility with nodes that predate variable-length payloads.

use crate::error::CreationError;
use crate::varint::read_bigsize;

/// Size of the HMAC that trails every per-hop frame.
pub const HMAC_SIZE: usize = 32;

/// Total size of a legacy (realm `0x00`) frame: the marker byte, 32 bytes of
/// fixed-format data, and the trailing HMAC.
pub const LEGACY_FRAME_SIZE: usize = 65;

/// Size of a legacy frame's content, excluding the trailing HMAC.
const LEGACY_CONTENT_SIZE: usize = LEGACY_FRAME_SIZE - HMAC_SIZE;

/// Given the bytes at the start of a (still-encrypted, but length-revealing)
/// per-hop frame, returns how many bytes that whole frame — payload and HMAC
/// together — occupies. Used by `peel` to find the frame boundary before any
/// decryption happens.
pub fn peek_payload_length(bytes: &[u8]) -> Option<usize> {
    match bytes.first() {
        None => None,
        Some(0x00) => Some(LEGACY_FRAME_SIZE),
        Some(_) => {
            let (prefix_len, value) = read_bigsize(bytes).ok()?;
            Some(prefix_len + value as usize + HMAC_SIZE)
        }
    }
}

/// Validates that a caller-supplied payload (the content a hop will
/// eventually see, *not* including the HMAC `create` appends) is
/// self-consistent: its own length prefix, if any, must match its actual
/// byte length.
pub fn validate_payload_framing(payload: &[u8], index: usize) -> Result<(), CreationError> {
    match payload.first() {
        Some(0x00) => {
            if payload.len() == LEGACY_CONTENT_SIZE {
                Ok(())
            } else {
                Err(CreationError::PayloadLengthMismatch { index })
            }
        }
        Some(_) => {
            let (prefix_len, value) =
                read_bigsize(payload).map_err(|_| CreationError::InvalidPayloadFraming { index })?;
            if prefix_len + value as usize == payload.len() {
                Ok(())
            } else {
                Err(CreationError::PayloadLengthMismatch { index })
            }
        }
        None => Err(CreationError::InvalidPayloadFraming { index }),
    }
}

/// The on-wire frame size (content plus HMAC) a validated payload will
/// occupy once `create` appends its HMAC.
pub fn framed_length(payload: &[u8]) -> usize {
    payload.len() + HMAC_SIZE
}
