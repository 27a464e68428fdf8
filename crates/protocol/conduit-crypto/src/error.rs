//! Error types for conduit-crypto

use thiserror::Error;

/// Errors that can occur when decoding addresses and digests
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid address string format
    #[error("Invalid address format: {0}")]
    InvalidAddressFormat(String),

    /// Invalid prefix in human-readable address
    #[error("Invalid address prefix: expected 'cdt1', got '{0}'")]
    InvalidAddressPrefix(String),

    /// Invalid base58 encoding
    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    /// Invalid hex encoding
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    /// Invalid byte length
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
