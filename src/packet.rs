//! The forward onion packet: fixed-width wire format, construction from an
//! ordered hop path, and one-hop peeling.

use crate::error::{CreationError, OnionError};
use crate::filler::generate_filler;
use crate::keys::{
    compute_ephemeral_keys_and_shared_secrets, next_ephemeral_pubkey, HopSecret, KeyType,
    SessionKey, SharedSecret,
};
use crate::payload::{framed_length, peek_payload_length, validate_payload_framing, HMAC_SIZE};
use crate::primitives::{ecdh, generate_keystream, hmac_sha256, sha256, xor_keystream};
use crate::MAX_HOPS;

use secp256k1::{PublicKey, SecretKey};
use subtle::ConstantTimeEq;

/// Onion version byte. The only value this core ever produces or accepts.
const VERSION: u8 = 0x00;

/// Size of the version byte plus a compressed public key plus the trailing
/// HMAC — the fixed overhead around the `P`-byte payload region.
const HEADER_OVERHEAD: usize = 1 + 33 + HMAC_SIZE;

/// A fixed-width Sphinx packet: version, ephemeral key, encrypted payload
/// region, and HMAC. `payload_region.len()` is always the `P` the packet was
/// built or parsed with (1300 for payment packets, 400 for trampoline).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnionPacket {
    ephemeral_pubkey: PublicKey,
    payload_region: Vec<u8>,
    hmac: [u8; HMAC_SIZE],
}

/// The result of peeling one layer off an [`OnionPacket`].
pub struct PeeledOnion {
    /// This hop's own payload, without its trailing HMAC.
    pub payload: Vec<u8>,
    /// The ECDH shared secret this hop derived — callers keep it to later
    /// authenticate a returned failure onion.
    pub shared_secret: SharedSecret,
    /// The packet to forward to the next hop.
    pub next_packet: OnionPacket,
    /// `true` iff `next_packet`'s HMAC is all-zero, i.e. this hop is the
    /// final recipient.
    pub is_last: bool,
}

impl OnionPacket {
    pub fn ephemeral_pubkey(&self) -> &PublicKey {
        &self.ephemeral_pubkey
    }

    pub fn payload_region(&self) -> &[u8] {
        &self.payload_region
    }

    pub fn hmac(&self) -> &[u8; HMAC_SIZE] {
        &self.hmac
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_OVERHEAD + self.payload_region.len());
        out.push(VERSION);
        out.extend_from_slice(&self.ephemeral_pubkey.serialize());
        out.extend_from_slice(&self.payload_region);
        out.extend_from_slice(&self.hmac);
        out
    }

    /// Parses a wire-format packet, validating its length, version, and
    /// ephemeral key. Does not touch the HMAC — that is only meaningful once
    /// a recipient's private key is available, in [`Self::peel`].
    pub fn from_bytes(bytes: &[u8], packet_payload_len: usize) -> Result<Self, OnionError> {
        let expected = HEADER_OVERHEAD + packet_payload_len;
        if bytes.len() != expected {
            return Err(OnionError::InvalidPacketLength {
                expected,
                actual: bytes.len(),
            });
        }

        if bytes[0] != VERSION {
            let hash = sha256(bytes);
            log::debug!("rejecting onion packet {}: unsupported version", hex::encode(hash));
            return Err(OnionError::InvalidOnionVersion(hash));
        }

        let ephemeral_pubkey = PublicKey::from_slice(&bytes[1..34]).map_err(|_| {
            let hash = sha256(bytes);
            log::debug!("rejecting onion packet {}: invalid ephemeral key", hex::encode(hash));
            OnionError::InvalidOnionKey(hash)
        })?;

        let payload_region = bytes[34..34 + packet_payload_len].to_vec();
        let mut hmac = [0u8; HMAC_SIZE];
        hmac.copy_from_slice(&bytes[34 + packet_payload_len..]);

        Ok(OnionPacket {
            ephemeral_pubkey,
            payload_region,
            hmac,
        })
    }

    /// Unwraps one layer using `private_key`. `associated_data` must be the
    /// same 32 bytes bound into the packet at construction (typically the
    /// payment hash).
    pub fn peel(
        &self,
        private_key: &SecretKey,
        associated_data: &[u8; 32],
    ) -> Result<PeeledOnion, OnionError> {
        let shared_secret_bytes = ecdh(private_key, &self.ephemeral_pubkey);

        let mu = KeyType::Mu.derive(&shared_secret_bytes);
        let mut mac_input = self.payload_region.clone();
        mac_input.extend_from_slice(associated_data);
        let expected_hmac = hmac_sha256(&mu, &mac_input);

        if expected_hmac.ct_eq(&self.hmac).unwrap_u8() != 1 {
            let hash = sha256(&self.to_bytes());
            log::debug!("rejecting onion packet {}: hmac mismatch", hex::encode(hash));
            return Err(OnionError::InvalidOnionHmac(hash));
        }

        let p = self.payload_region.len();
        let rho = KeyType::Rho.derive(&shared_secret_bytes);
        let mut decrypted = self.payload_region.clone();
        decrypted.resize(2 * p, 0u8);
        xor_keystream(&rho, &mut decrypted);

        let frame_len = peek_payload_length(&decrypted)
            .filter(|&l| l >= HMAC_SIZE && l <= p)
            .ok_or_else(|| {
                let hash = sha256(&self.to_bytes());
                log::debug!("rejecting onion packet {}: frame runs past packet boundary", hex::encode(hash));
                OnionError::InvalidPayloadLength(hash)
            })?;

        let payload = decrypted[..frame_len - HMAC_SIZE].to_vec();
        let mut next_hmac = [0u8; HMAC_SIZE];
        next_hmac.copy_from_slice(&decrypted[frame_len - HMAC_SIZE..frame_len]);
        let next_payload_region = decrypted[frame_len..frame_len + p].to_vec();

        let shared_secret = SharedSecret::new(shared_secret_bytes);
        let next_ephemeral_pubkey = next_ephemeral_pubkey(&self.ephemeral_pubkey, &shared_secret)
            .map_err(|_| {
                let hash = sha256(&self.to_bytes());
                log::debug!("rejecting onion packet {}: blinded key left the curve", hex::encode(hash));
                OnionError::InvalidOnionKey(hash)
            })?;

        let is_last = next_hmac == [0u8; HMAC_SIZE];

        Ok(PeeledOnion {
            payload,
            shared_secret,
            next_packet: OnionPacket {
                ephemeral_pubkey: next_ephemeral_pubkey,
                payload_region: next_payload_region,
                hmac: next_hmac,
            },
            is_last,
        })
    }
}

/// Builds a forward onion over an ordered hop path.
///
/// `payloads[i]` is the raw content this hop will see after peeling (its own
/// length prefix included, HMAC excluded — `create` appends that). Returns
/// the packet and the shared-secrets record needed later to authenticate a
/// returned failure onion.
pub fn create(
    session_key: &SessionKey,
    hop_pubkeys: &[PublicKey],
    payloads: &[Vec<u8>],
    associated_data: &[u8; 32],
    packet_payload_len: usize,
) -> Result<(OnionPacket, Vec<HopSecret>), CreationError> {
    let n = hop_pubkeys.len();
    if n == 0 || n > MAX_HOPS {
        return Err(CreationError::InvalidHopCount { count: n });
    }
    if payloads.len() != n {
        return Err(CreationError::HopCountMismatch {
            pubkeys: n,
            payloads: payloads.len(),
        });
    }

    for (i, payload) in payloads.iter().enumerate() {
        validate_payload_framing(payload, i)?;
    }

    let frame_sizes: Vec<usize> = payloads.iter().map(|p| framed_length(p)).collect();
    let total: usize = frame_sizes.iter().sum();
    if total > packet_payload_len {
        return Err(CreationError::PacketOverflow {
            needed: total,
            capacity: packet_payload_len,
        });
    }

    let hops = compute_ephemeral_keys_and_shared_secrets(session_key, hop_pubkeys)?;

    let filler = generate_filler(&hops[..n - 1], &frame_sizes[..n - 1], packet_payload_len);

    let pad_key = KeyType::Pad.derive(session_key.as_bytes());
    let mut payload_region = generate_keystream(&pad_key, packet_payload_len);

    let mut hmac = [0u8; HMAC_SIZE];
    for i in (0..n).rev() {
        let hop_size = frame_sizes[i];
        payload_region.truncate(packet_payload_len - hop_size);

        let mut shifted = Vec::with_capacity(packet_payload_len);
        shifted.extend_from_slice(&payloads[i]);
        shifted.extend_from_slice(&hmac);
        shifted.extend_from_slice(&payload_region);
        payload_region = shifted;

        let rho = KeyType::Rho.derive(hops[i].shared_secret.as_bytes());
        xor_keystream(&rho, &mut payload_region);

        if i == n - 1 && !filler.is_empty() {
            let start = packet_payload_len - filler.len();
            payload_region[start..].copy_from_slice(&filler);
        }

        let mu = KeyType::Mu.derive(hops[i].shared_secret.as_bytes());
        let mut mac_input = payload_region.clone();
        mac_input.extend_from_slice(associated_data);
        hmac = hmac_sha256(&mu, &mac_input);
    }

    let packet = OnionPacket {
        ephemeral_pubkey: hops[0].ephemeral_pubkey,
        payload_region,
        hmac,
    };

    Ok((packet, hops))
}

#[cfg(feature = "serde-support")]
mod serde_impl {
    use super::OnionPacket;
    use crate::payload::HMAC_SIZE;

    use secp256k1::PublicKey;
    use serde::de::{Error as DeError, SeqAccess, Visitor};
    use serde::ser::SerializeTuple;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    /// Serializes as a self-describing `(ephemeral_key_bytes, payload_region,
    /// hmac)` tuple rather than the fixed-width `to_bytes`/`from_bytes` wire
    /// format, since a serde envelope (JSON, CBOR, ...) carries its own length
    /// framing and has no equivalent of `packet_payload_len` to pass in.
    impl Serialize for OnionPacket {
        fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
            let mut tuple = serializer.serialize_tuple(3)?;
            tuple.serialize_element(&self.ephemeral_pubkey.serialize())?;
            tuple.serialize_element(&self.payload_region)?;
            tuple.serialize_element(&self.hmac)?;
            tuple.end()
        }
    }

    impl<'de> Deserialize<'de> for OnionPacket {
        fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
            struct PacketVisitor;

            impl<'de> Visitor<'de> for PacketVisitor {
                type Value = OnionPacket;

                fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    f.write_str("a (ephemeral_key, payload_region, hmac) tuple")
                }

                fn visit_seq<Seq: SeqAccess<'de>>(self, mut seq: Seq) -> Result<Self::Value, Seq::Error> {
                    let key_bytes: [u8; 33] = seq
                        .next_element()?
                        .ok_or_else(|| DeError::invalid_length(0, &self))?;
                    let payload_region: Vec<u8> = seq
                        .next_element()?
                        .ok_or_else(|| DeError::invalid_length(1, &self))?;
                    let hmac: [u8; HMAC_SIZE] = seq
                        .next_element()?
                        .ok_or_else(|| DeError::invalid_length(2, &self))?;

                    let ephemeral_pubkey = PublicKey::from_slice(&key_bytes)
                        .map_err(|e| DeError::custom(format!("invalid ephemeral key: {e}")))?;

                    Ok(OnionPacket {
                        ephemeral_pubkey,
                        payload_region,
                        hmac,
                    })
                }
            }

            deserializer.deserialize_tuple(3, PacketVisitor)
        }
    }
}
