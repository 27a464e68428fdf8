//! Domain-separated SHA-256 digests.
//!
//! Every digest the ledger derives goes through [`tagged_hash`]:
//! ```text
//! TaggedHash(domain, parts) = H(domain || for each part: len(part) as u64be || part)
//! ```
//! The length prefix keeps `["ab", "c"]` and `["a", "bc"]` apart.

use sha2::{Digest, Sha256};

use crate::Hash;

/// Domain separator for account keys (public key -> address)
pub(crate) const DOMAIN_KEY: u8 = 0x00;

/// Domain separator for request context identifiers
pub const DOMAIN_REQUEST_CONTEXT: u8 = 0x01;

/// Domain separator for module account addresses
pub const DOMAIN_MODULE: u8 = 0x02;

/// Hash a sequence of byte strings under a domain separator.
///
/// # Example
/// ```
/// use conduit_crypto::{tagged_hash, DOMAIN_REQUEST_CONTEXT};
///
/// let a = tagged_hash(DOMAIN_REQUEST_CONTEXT, &[b"ab", b"c"]);
/// let b = tagged_hash(DOMAIN_REQUEST_CONTEXT, &[b"a", b"bc"]);
/// assert_ne!(a, b);
/// ```
pub fn tagged_hash(domain: u8, parts: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update([domain]);
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let result: [u8; 32] = hasher.finalize().into();
    Hash(result)
}
