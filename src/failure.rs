//! The backward failure onion.
//!
//! When a hop cannot forward a payment it reports why by building a
//! fixed-width encrypted error packet bound to its own shared secret, then
//! sends it to the previous hop, which wraps it again under its own shared
//! secret, and so on back to the originator. The originator is the only
//! party holding every shared secret on the path, so it is the only one that
//! can authenticate the packet and learn both the failure reason and which
//! hop reported it.

use crate::error::FailureDecryptError;
use crate::keys::{HopSecret, KeyType, SharedSecret};
use crate::primitives::{hmac_sha256, xor_keystream};

use secp256k1::PublicKey;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Total size of an encrypted failure packet, fixed regardless of which
/// message it carries.
pub const FAILURE_PACKET_LEN: usize = 292;

const HMAC_SIZE: usize = 32;
/// Combined size of the failure message and its padding.
const BODY_LEN: usize = 256;

const CODE_TEMPORARY_NODE_FAILURE: u16 = 0x2002;
const CODE_INVALID_REALM: u16 = 0x4001;
const CODE_INVALID_ONION_VERSION: u16 = 0xc004;
const CODE_INVALID_ONION_HMAC: u16 = 0xc005;
const CODE_INVALID_ONION_KEY: u16 = 0xc006;
const CODE_INCORRECT_OR_UNKNOWN_PAYMENT_DETAILS: u16 = 0x400f;

/// A decoded failure reason.
///
/// `IncorrectOrUnknownPaymentDetails` has three historical wire encodings —
/// no trailing data, amount only, or amount and block height — kept for
/// compatibility with nodes running older software. `Unknown` preserves any
/// failure code this build does not recognize, so an unrecognized extension
/// never turns into a decode error for callers that only care about the
/// originating hop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureMessage {
    TemporaryNodeFailure,
    InvalidRealm,
    InvalidOnionVersion,
    InvalidOnionKey,
    InvalidOnionHmac,
    IncorrectOrUnknownPaymentDetails {
        amount_msat: Option<u64>,
        block_height: Option<u32>,
    },
    Unknown(u16, Vec<u8>),
}

impl FailureMessage {
    fn encode(&self) -> Vec<u8> {
        match self {
            FailureMessage::TemporaryNodeFailure => {
                CODE_TEMPORARY_NODE_FAILURE.to_be_bytes().to_vec()
            }
            FailureMessage::InvalidRealm => CODE_INVALID_REALM.to_be_bytes().to_vec(),
            FailureMessage::InvalidOnionVersion => {
                CODE_INVALID_ONION_VERSION.to_be_bytes().to_vec()
            }
            FailureMessage::InvalidOnionKey => CODE_INVALID_ONION_KEY.to_be_bytes().to_vec(),
            FailureMessage::InvalidOnionHmac => CODE_INVALID_ONION_HMAC.to_be_bytes().to_vec(),
            FailureMessage::IncorrectOrUnknownPaymentDetails {
                amount_msat,
                block_height,
            } => {
                // Always emit the richest encoding; decoders still accept the
                // two shorter historical forms.
                let mut out = CODE_INCORRECT_OR_UNKNOWN_PAYMENT_DETAILS.to_be_bytes().to_vec();
                out.extend_from_slice(&amount_msat.unwrap_or(0).to_be_bytes());
                out.extend_from_slice(&block_height.unwrap_or(0).to_be_bytes());
                out
            }
            FailureMessage::Unknown(code, data) => {
                let mut out = code.to_be_bytes().to_vec();
                out.extend_from_slice(data);
                out
            }
        }
    }

    fn decode(bytes: &[u8]) -> Self {
        if bytes.len() < 2 {
            return FailureMessage::Unknown(0, bytes.to_vec());
        }
        let code = u16::from_be_bytes([bytes[0], bytes[1]]);
        let data = &bytes[2..];
        match code {
            CODE_TEMPORARY_NODE_FAILURE => FailureMessage::TemporaryNodeFailure,
            CODE_INVALID_REALM => FailureMessage::InvalidRealm,
            CODE_INVALID_ONION_VERSION => FailureMessage::InvalidOnionVersion,
            CODE_INVALID_ONION_HMAC => FailureMessage::InvalidOnionHmac,
            CODE_INVALID_ONION_KEY => FailureMessage::InvalidOnionKey,
            CODE_INCORRECT_OR_UNKNOWN_PAYMENT_DETAILS => {
                let amount_msat = data
                    .get(0..8)
                    .map(|b| u64::from_be_bytes(b.try_into().expect("checked length")));
                let block_height = data
                    .get(8..12)
                    .map(|b| u32::from_be_bytes(b.try_into().expect("checked length")));
                FailureMessage::IncorrectOrUnknownPaymentDetails {
                    amount_msat,
                    block_height,
                }
            }
            other => FailureMessage::Unknown(other, data.to_vec()),
        }
    }
}

/// The failure message and the hop that reported it, recovered by
/// [`decrypt`].
pub struct DecryptedFailure {
    pub origin_hop: PublicKey,
    pub message: FailureMessage,
}

/// Builds a fresh failure packet at the hop that detected the error,
/// authenticated and encrypted under its own shared secret. The caller sends
/// the result to the previous hop, which relays it onward via [`wrap`].
pub fn create(shared_secret: &SharedSecret, message: &FailureMessage) -> [u8; FAILURE_PACKET_LEN] {
    let encoded = message.encode();
    assert!(
        encoded.len() <= BODY_LEN,
        "failure message does not fit in the 256-byte body"
    );
    let failure_len = encoded.len();
    let pad_len = BODY_LEN - failure_len;

    // The HMAC authenticates the message and its padding (256 bytes total),
    // not the two length fields that frame them on the wire.
    let mut body: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::with_capacity(BODY_LEN));
    body.extend_from_slice(&encoded);
    body.resize(BODY_LEN, 0u8);

    let um = KeyType::Um.derive(shared_secret.as_bytes());
    let hmac = hmac_sha256(&um, &body);

    // Wire layout: hmac(32) ‖ failureLen(2) ‖ message(failureLen) ‖ padLen(2)
    // ‖ padding(padLen) — padLen sits immediately after the message, not at
    // the end of the packet.
    let mut cleartext = Vec::with_capacity(FAILURE_PACKET_LEN);
    cleartext.extend_from_slice(&hmac);
    cleartext.extend_from_slice(&(failure_len as u16).to_be_bytes());
    cleartext.extend_from_slice(&encoded);
    cleartext.extend_from_slice(&(pad_len as u16).to_be_bytes());
    cleartext.extend_from_slice(&body[failure_len..]);
    debug_assert_eq!(cleartext.len(), FAILURE_PACKET_LEN);

    let mut packet = [0u8; FAILURE_PACKET_LEN];
    packet.copy_from_slice(&cleartext);

    let ammag = KeyType::Ammag.derive(shared_secret.as_bytes());
    xor_keystream(&ammag, &mut packet);
    packet
}

/// Adds one more encryption layer as the packet passes back through an
/// intermediate hop. Size-preserving.
pub fn wrap(packet: &[u8; FAILURE_PACKET_LEN], shared_secret: &SharedSecret) -> [u8; FAILURE_PACKET_LEN] {
    let ammag = KeyType::Ammag.derive(shared_secret.as_bytes());
    let mut out = *packet;
    xor_keystream(&ammag, &mut out);
    out
}

/// Authenticates a received failure packet against an ordered list of shared
/// secrets, accumulating one XOR layer per hop until one layer's `um` key
/// authenticates the result. `hops` must be in the same order `create`
/// returned them in (closest hop first).
pub fn decrypt(
    packet: &[u8; FAILURE_PACKET_LEN],
    hops: &[HopSecret],
) -> Result<DecryptedFailure, FailureDecryptError> {
    let mut buf = *packet;

    for hop in hops {
        log::trace!("trying shared secret for hop {}", hop.ephemeral_pubkey);
        let ammag = KeyType::Ammag.derive(hop.shared_secret.as_bytes());
        xor_keystream(&ammag, &mut buf);

        let failure_len = u16::from_be_bytes([buf[HMAC_SIZE], buf[HMAC_SIZE + 1]]) as usize;
        if failure_len > BODY_LEN {
            continue;
        }

        // Wire layout: hmac(32) ‖ failureLen(2) ‖ message(failureLen) ‖
        // padLen(2) ‖ padding(padLen). The HMAC covers message ‖ padding
        // (256 bytes), skipping over the padLen field in between.
        let message_start = HMAC_SIZE + 2;
        let message_end = message_start + failure_len;
        let padding_start = message_end + 2;

        let mut body: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::with_capacity(BODY_LEN));
        body.extend_from_slice(&buf[message_start..message_end]);
        body.extend_from_slice(&buf[padding_start..FAILURE_PACKET_LEN]);

        let um = KeyType::Um.derive(hop.shared_secret.as_bytes());
        let expected_hmac = hmac_sha256(&um, &body);

        if expected_hmac.ct_eq(&buf[0..HMAC_SIZE]).unwrap_u8() == 1 {
            let message = FailureMessage::decode(&buf[message_start..message_end]);
            return Ok(DecryptedFailure {
                origin_hop: hop.ephemeral_pubkey,
                message,
            });
        }
    }

    Err(FailureDecryptError)
}
