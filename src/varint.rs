//! BOLT bigsize variable-length integer decoding.
//!
//! A bigsize is the protocol's compact encoding for payload-framing length
//! prefixes: a 1-byte value for small numbers, widening to 3/5/9 bytes for
//! larger ones. This is the only integer format the onion core needs to
//! understand; everything else in a per-hop payload is opaque to it.

/// A bigsize prefix was truncated: fewer bytes were supplied than the first
/// byte promises to read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BigSizeError;

/// Reads one bigsize from the front of `bytes`.
///
/// Returns `(prefix_len, value)`, where `prefix_len` is how many bytes the
/// encoding itself occupied (1, 3, 5, or 9) and `value` is the decoded
/// integer.
pub fn read_bigsize(bytes: &[u8]) -> Result<(usize, u64), BigSizeError> {
    match bytes.first() {
        None => Err(BigSizeError),
        Some(0xff) => {
            let b = bytes.get(1..9).ok_or(BigSizeError)?;
            Ok((9, u64::from_be_bytes(b.try_into().unwrap())))
        }
        Some(0xfe) => {
            let b = bytes.get(1..5).ok_or(BigSizeError)?;
            Ok((5, u32::from_be_bytes(b.try_into().unwrap()) as u64))
        }
        Some(0xfd) => {
            let b = bytes.get(1..3).ok_or(BigSizeError)?;
            Ok((3, u16::from_be_bytes(b.try_into().unwrap()) as u64))
        }
        Some(&b) => Ok((1, b as u64)),
    }
}
