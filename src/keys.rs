//! Per-hop key schedule: ephemeral key blinding, ECDH shared secrets, and the
//! five labelled sub-keys (`rho`, `mu`, `um`, `pad`, `ammag`) derived from
//! each shared secret by HMAC.

use crate::error::CreationError;
use crate::primitives::{blinding_factor, ecdh, hmac_sha256};

use secp256k1::{PublicKey, SecretKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// The one-shot scalar an originator picks per packet. Zeroised on drop; the
/// spec forbids reuse across packets, so there is never a reason to keep one
/// around once `create` returns.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SessionKey([u8; 32]);

impl SessionKey {
    pub fn new(bytes: [u8; 32]) -> Result<Self, secp256k1::Error> {
        // Validate eagerly so callers get a clear error instead of a panic
        // the first time the key schedule tries to use it.
        SecretKey::from_slice(&bytes)?;
        Ok(SessionKey(bytes))
    }

    pub fn random<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            if let Ok(key) = Self::new(bytes) {
                return key;
            }
        }
    }

    pub fn as_secret_key(&self) -> SecretKey {
        SecretKey::from_slice(&self.0).expect("validated at construction")
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(secp256k1::SECP256K1, &self.as_secret_key())
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// A 32-byte ECDH shared secret between the originator and one hop. Zeroised
/// on drop; every sub-key in the schedule is derived from this value.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub(crate) fn new(bytes: [u8; 32]) -> Self {
        SharedSecret(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SharedSecret {}

/// The five labelled sub-keys derived from a shared secret by
/// `HMAC-SHA256(label, s)`. `Pad` is the one exception: it is derived from
/// the session scalar itself rather than a per-hop shared secret, and is
/// only ever used once, by the originator, to fill unused packet space with
/// indistinguishable noise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    Rho,
    Mu,
    Um,
    Pad,
    Ammag,
}

impl KeyType {
    fn label(self) -> &'static [u8] {
        match self {
            KeyType::Rho => b"rho",
            KeyType::Mu => b"mu",
            KeyType::Um => b"um",
            KeyType::Pad => b"pad",
            KeyType::Ammag => b"ammag",
        }
    }

    pub fn derive(self, input: &[u8; 32]) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(hmac_sha256(self.label(), input))
    }
}

/// One entry of the shared-secrets record the originator keeps after
/// `create`, used later to decrypt a returned failure onion and to identify
/// which hop it came from.
#[derive(Clone)]
pub struct HopSecret {
    pub shared_secret: SharedSecret,
    pub ephemeral_pubkey: PublicKey,
}

impl Zeroize for HopSecret {
    fn zeroize(&mut self) {
        self.shared_secret.0.zeroize();
    }
}

impl Drop for HopSecret {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Derives, for an ordered hop path, each hop's ephemeral public key `alpha`
/// and ECDH shared secret `s`, following the multiplicative blinding chain:
/// `alpha_0 = sessionKey * G`, `s_i = ECDH(blindingChain_i * sessionKey,
/// hopPubkey_i)`, `blind_i = SHA256(alpha_i || s_i)`.
pub fn compute_ephemeral_keys_and_shared_secrets(
    session_key: &SessionKey,
    hop_pubkeys: &[PublicKey],
) -> Result<Vec<HopSecret>, CreationError> {
    let secp = secp256k1::SECP256K1;

    let mut blinded_session_key = session_key.as_secret_key();
    let mut alpha = session_key.public_key();

    let mut hops = Vec::with_capacity(hop_pubkeys.len());
    for hop_pubkey in hop_pubkeys {
        let shared_secret = SharedSecret(ecdh(&blinded_session_key, hop_pubkey));

        hops.push(HopSecret {
            shared_secret: shared_secret.clone(),
            ephemeral_pubkey: alpha,
        });

        let blind = blinding_factor(&alpha, shared_secret.as_bytes());
        blinded_session_key = blinded_session_key.mul_tweak(&blind)?;
        alpha = alpha.mul_tweak(secp, &blind)?;
    }

    Ok(hops)
}

/// Derives the `alpha` the *next* hop will see, given the current hop's own
/// ephemeral key and the shared secret it just computed. Used by `peel` to
/// build the packet it forwards.
pub fn next_ephemeral_pubkey(
    alpha: &PublicKey,
    shared_secret: &SharedSecret,
) -> Result<PublicKey, secp256k1::Error> {
    let blind = blinding_factor(alpha, shared_secret.as_bytes());
    alpha.mul_tweak(secp256k1::SECP256K1, &blind)
}
