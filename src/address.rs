//! Deterministic pseudo-addresses for puppet WEBIRC spoofing.
//!
//! Every puppet presents a distinct source address to the IRC network. The
//! address is derived from the puppet's nickname so that the same Discord
//! user keeps the same apparent origin across reconnects and restarts.

use sha1::{Digest, Sha1};
use std::net::Ipv6Addr;

/// Top byte of every derived address (`fd00::/8`, locally-assigned ULA).
pub const ULA_MARKER: u8 = 0xfd;

/// Hash `seed` into a single IPv6 address inside `fd00::/8`.
///
/// SHA-1 keeps addresses identical to those earlier bridge deployments
/// handed out, so server-side WEBIRC exemptions keep matching. The first
/// 16 digest bytes are read big-endian, the top 7 bits are
/// cleared and the top byte is forced to [`ULA_MARKER`].
pub fn derive_address(seed: &str) -> Ipv6Addr {
    let digest = Sha1::digest(seed.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);

    let mut addr = u128::from_be_bytes(bytes);
    addr &= (1u128 << 121) - 1;
    addr |= (ULA_MARKER as u128) << 120;

    Ipv6Addr::from(addr)
}
