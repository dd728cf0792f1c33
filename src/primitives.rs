//! Thin wrappers around the cryptographic primitives the onion core needs:
//! secp256k1 scalar/point arithmetic, SHA-256, HMAC-SHA256, and a zero-nonce
//! ChaCha20 keystream. Nothing here is onion-specific; `keys`, `filler`,
//! `packet`, and `failure` are the callers that give these meaning.

use chacha20::cipher::generic_array::GenericArray;
use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::ChaCha20;
use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, SecretKey};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// All-zero 96-bit nonce: every sub-key is derived fresh per packet, so a
/// fixed nonce never reuses a (key, nonce) pair.
const ZERO_NONCE: [u8; 12] = [0u8; 12];

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn sha256_concat(a: &[u8], b: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// `HMAC-SHA256(key, msg)`, used both for the `rho`/`mu`/`um`/`pad`/`ammag`
/// sub-key schedule and for per-hop/failure-packet authentication.
pub fn hmac_sha256(key: &[u8], msg: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(msg);
    mac.finalize().into_bytes().into()
}

/// Generates `out.len()` bytes of ChaCha20 keystream under `key` and XORs
/// them into `out` in place, starting at stream position 0.
pub fn xor_keystream(key: &[u8; 32], out: &mut [u8]) {
    xor_keystream_at(key, 0, out)
}

/// As [`xor_keystream`], but seeks the stream to byte offset `offset` first.
/// Used by the filler generator, which only ever needs the *tail* of a long
/// keystream without materializing the bytes that precede it.
pub fn xor_keystream_at(key: &[u8; 32], offset: u32, out: &mut [u8]) {
    let key = GenericArray::from_slice(key);
    let nonce = GenericArray::from_slice(&ZERO_NONCE);
    let mut cipher = ChaCha20::new(key, nonce);
    if offset != 0 {
        cipher.seek(offset);
    }
    cipher.apply_keystream(out);
}

/// Generates a fresh `len`-byte keystream under `key` (a zero-filled buffer
/// XORed with the cipher is exactly the keystream itself).
pub fn generate_keystream(key: &[u8; 32], len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    xor_keystream(key, &mut buf);
    buf
}

/// `SHA256(serialize(scalar · point))`, the shared secret between an
/// ephemeral session key and a hop's public key (or equivalently, between a
/// hop's private key and its ephemeral public key — both sides land on the
/// same point).
pub fn ecdh(secret_key: &SecretKey, public_key: &PublicKey) -> [u8; 32] {
    let scalar = Scalar::from_be_bytes(secret_key.secret_bytes())
        .expect("a valid secret key is always a valid scalar");
    let shared_point = public_key
        .mul_tweak(secp256k1::SECP256K1, &scalar)
        .expect("public_key is a valid curve point and scalar is nonzero with overwhelming probability");
    sha256(&shared_point.serialize())
}

/// Interprets `SHA256(alpha ‖ shared_secret)` as a scalar mod the curve
/// order, for the multiplicative ephemeral-key blinding chain.
pub fn blinding_factor(ephemeral_pubkey: &PublicKey, shared_secret: &[u8; 32]) -> Scalar {
    let digest = sha256_concat(&ephemeral_pubkey.serialize(), shared_secret);
    Scalar::from_be_bytes(digest).unwrap_or_else(|_| {
        // A SHA-256 output landing outside [1, n) happens with probability
        // ~2^-128; fall back to re-hashing rather than ever failing a build.
        let digest = sha256(&digest);
        Scalar::from_be_bytes(digest).expect("re-hash is astronomically unlikely to collide twice")
    })
}
