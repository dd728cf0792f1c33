//! Filler generation: the deterministic tail bytes that keep every onion
//! packet the same width no matter how many hops are on the path.
//!
//! Each time `create` shifts the payload region right to make room for a new
//! hop's data, the vacated tail must look exactly like what that hop's own
//! unwrap would produce — otherwise the packet's length, or the distribution
//! of its trailing bytes, would leak the path length to an observer. The
//! filler is precomputed once up front and spliced into the tail of the
//! outermost (last-hop) layer.

use crate::keys::{HopSecret, KeyType};
use crate::primitives::generate_keystream;

/// Builds the filler for a path of `hops` (all hops except the final one —
/// the final hop never forwards, so it has no tail to disguise).
///
/// For each hop in order, the filler is extended by that hop's `hop_size`
/// zero bytes, then XORed with the tail of a `packet_payload_len +
/// filler.len()`-byte keystream under that hop's `rho` key. By construction
/// this is exactly the suffix an intermediate hop's own `rho`-keyed XOR will
/// reproduce when it shifts its `hop_size` bytes off the front of the
/// packet.
pub fn generate_filler(hops: &[HopSecret], hop_sizes: &[usize], packet_payload_len: usize) -> Vec<u8> {
    debug_assert_eq!(hops.len(), hop_sizes.len());

    let mut filler = Vec::new();
    for (hop, &hop_size) in hops.iter().zip(hop_sizes.iter()) {
        filler.resize(filler.len() + hop_size, 0u8);

        let rho = KeyType::Rho.derive(hop.shared_secret.as_bytes());
        let stream_len = packet_payload_len + filler.len();
        let stream = generate_keystream(&rho, stream_len);

        let tail_start = stream_len - filler.len();
        for (byte, stream_byte) in filler.iter_mut().zip(stream[tail_start..].iter()) {
            *byte ^= stream_byte;
        }
    }
    filler
}
