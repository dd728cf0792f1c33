use thiserror::Error;

/// Errors detected while constructing a forward onion.
///
/// These are malformed-input errors (see `create`'s preconditions): they are
/// caught before any packet bytes are produced, so there is never a partial
/// packet to clean up.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum CreationError {
    #[error("hop count {count} outside the allowed range of 1..=20")]
    InvalidHopCount { count: usize },

    #[error("got {pubkeys} hop public keys but {payloads} payloads")]
    HopCountMismatch { pubkeys: usize, payloads: usize },

    #[error("payload {index} has no parseable length prefix")]
    InvalidPayloadFraming { index: usize },

    #[error("payload {index}'s length prefix disagrees with its byte length")]
    PayloadLengthMismatch { index: usize },

    #[error("payloads require {needed} bytes but the packet only has {capacity}")]
    PacketOverflow { needed: usize, capacity: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] secp256k1::Error),
}

/// Errors returned by [`crate::packet::OnionPacket::peel`].
///
/// Each tagged variant carries the SHA-256 hash of the received packet so the
/// caller can report to its peer exactly what was rejected, without needing
/// to retain (or re-log) the packet itself.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum OnionError {
    #[error("packet has {actual} bytes, expected {expected}")]
    InvalidPacketLength { expected: usize, actual: usize },

    #[error("unsupported onion version, packet hash {}", hex::encode(.0))]
    InvalidOnionVersion([u8; 32]),

    #[error("ephemeral key is not a valid point, packet hash {}", hex::encode(.0))]
    InvalidOnionKey([u8; 32]),

    #[error("hmac mismatch, packet hash {}", hex::encode(.0))]
    InvalidOnionHmac([u8; 32]),

    #[error("peeled frame runs past the packet boundary, packet hash {}", hex::encode(.0))]
    InvalidPayloadLength([u8; 32]),
}

/// The originator could not authenticate any layer of a returned failure
/// onion against its stored shared secrets. Deliberately opaque: a caller
/// must not be able to distinguish this from any other unwind reason.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
#[error("failure onion did not authenticate against any known shared secret")]
pub struct FailureDecryptError;
