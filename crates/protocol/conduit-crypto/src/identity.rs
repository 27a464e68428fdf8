//! Account identities.
//!
//! An address is derived from an Ed25519 public key:
//! ```text
//! Address = H(0x00 || public_key)[0:20]
//! ```
//! Module accounts (fee escrow, deposit escrow, tax) have no key; their
//! address is `H(0x02 || name)[0:20]`.
//!
//! Human-readable format: `cdt1` + base58(Address)

use ed25519_dalek::SigningKey;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::hash::{tagged_hash, DOMAIN_KEY, DOMAIN_MODULE};
use crate::{Address, PrivateKey, PublicKey};

/// Human-readable address prefix
const ADDRESS_PREFIX: &str = "cdt1";

/// Generate a new Ed25519 identity from the given RNG.
///
/// The simulator passes a seeded RNG so runs are reproducible.
pub fn generate_identity<R: RngCore + CryptoRng>(rng: &mut R) -> (PrivateKey, PublicKey) {
    let signing_key = SigningKey::generate(rng);
    let verifying_key = signing_key.verifying_key();

    let private_key = PrivateKey::from_signing_key(&signing_key);
    let public_key = PublicKey(verifying_key.to_bytes());

    (private_key, public_key)
}

/// Derive an account address from a public key.
///
/// # Example
/// ```
/// use conduit_crypto::{address_from_public_key, PublicKey};
///
/// let address = address_from_public_key(&PublicKey([7u8; 32]));
/// assert_eq!(address.0.len(), 20);
/// ```
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    let mut hasher = Sha256::new();
    hasher.update([DOMAIN_KEY]);
    hasher.update(public_key.0);
    let hash: [u8; 32] = hasher.finalize().into();

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[..20]);
    Address(address)
}

/// Derive the keyless address of a named module account.
pub fn module_address(name: &str) -> Address {
    let hash = tagged_hash(DOMAIN_MODULE, &[name.as_bytes()]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash.0[..20]);
    Address(address)
}

/// Convert an address to its human-readable string format.
pub fn address_to_string(address: &Address) -> String {
    let encoded = bs58::encode(&address.0).into_string();
    format!("{}{}", ADDRESS_PREFIX, encoded)
}

/// Parse a human-readable address string.
///
/// # Errors
/// - `InvalidAddressPrefix` if the string doesn't start with `cdt1`
/// - `InvalidBase58` if the base58 decoding fails
/// - `InvalidLength` if the decoded data isn't 20 bytes
pub fn address_from_string(s: &str) -> Result<Address, CryptoError> {
    let Some(base58_part) = s.strip_prefix(ADDRESS_PREFIX) else {
        let prefix: String = s.chars().take(4).collect();
        return Err(CryptoError::InvalidAddressPrefix(prefix));
    };

    if base58_part.is_empty() {
        return Err(CryptoError::InvalidAddressFormat(
            "Missing data after prefix".to_string(),
        ));
    }

    let decoded = bs58::decode(base58_part)
        .into_vec()
        .map_err(|e| CryptoError::InvalidBase58(e.to_string()))?;

    if decoded.len() != 20 {
        return Err(CryptoError::InvalidLength {
            expected: 20,
            actual: decoded.len(),
        });
    }

    let mut address = [0u8; 20];
    address.copy_from_slice(&decoded);
    Ok(Address(address))
}
