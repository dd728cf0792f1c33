//! Sphinx onion-routing core.
//!
//! Builds and unwraps the layered, constant-width packets a Lightning
//! payment travels in, and the backward failure onion a hop uses to report
//! why it could not forward a payment. This crate is purely computational:
//! it performs no I/O, holds no state across calls, and knows nothing about
//! channel graphs, routing policy, or payload semantics beyond the length
//! prefix needed to frame one hop's data from the next.

#![forbid(unsafe_code)]

pub mod error;
pub mod failure;
pub mod filler;
pub mod keys;
pub mod packet;
pub mod payload;
pub mod primitives;
pub mod varint;

#[cfg(test)]
mod test_vectors;

pub use error::{CreationError, FailureDecryptError, OnionError};
pub use failure::{DecryptedFailure, FailureMessage, FAILURE_PACKET_LEN};
pub use keys::{HopSecret, SessionKey, SharedSecret};
pub use packet::{create, OnionPacket, PeeledOnion};

/// Encrypted payload region width for a payment onion.
pub const PAYMENT_PAYLOAD_SIZE: usize = 1300;

/// Encrypted payload region width for a trampoline onion. Kept distinct from
/// [`PAYMENT_PAYLOAD_SIZE`] so callers can thread either through the same
/// `create`/`peel` code path; `P` is a construction-time parameter, not a
/// compile-time constant.
pub const TRAMPOLINE_PAYLOAD_SIZE: usize = 400;

/// Maximum number of hops a single onion may address.
pub const MAX_HOPS: usize = 20;
