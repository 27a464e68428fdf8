//! Request contexts, per-provider requests and responses.

use std::fmt;

use conduit_crypto::{Address, CryptoError, Hash};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{REQUEST_CONTEXT_ID_LEN, REQUEST_ID_LEN, RESULT_CODE_OK, UNLIMITED_REPEATS};
use crate::{BlockHeight, Coins};

/// Identifier of a request context.
pub type RequestContextId = Hash;

/// Lifecycle state of a request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestContextState {
    /// A non-repeated context with its single round in flight
    Running,
    /// Rounds suspended by the consumer
    Paused,
    /// Terminal
    Completed,
    /// A repeated context with a round in flight
    BatchRunning,
    /// A repeated context between rounds, waiting for its next tick
    BatchCompleted,
}

impl RequestContextState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// States the consumer may pause from.
    pub fn is_pausable(&self) -> bool {
        matches!(self, Self::Running | Self::BatchRunning | Self::BatchCompleted)
    }
}

impl fmt::Display for RequestContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::BatchRunning => write!(f, "BATCHRUNNING"),
            Self::BatchCompleted => write!(f, "BATCHCOMPLETED"),
        }
    }
}

/// A consumer's handle to one, possibly repeating, service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub id: RequestContextId,
    pub service_name: String,
    pub providers: Vec<Address>,
    pub consumer: Address,
    pub input: String,
    pub service_fee_cap: Coins,
    /// Name of the registered callback receiving round results, if any
    pub module_name: Option<String>,
    /// Blocks a provider has to respond
    pub timeout: u64,
    pub super_mode: bool,
    pub repeated: bool,
    /// Blocks between round starts; zero means `timeout`
    pub repeated_frequency: u64,
    /// Total rounds, or [`UNLIMITED_REPEATS`]
    pub repeated_total: i64,
    /// Responses that complete a round early; zero waits for every provider
    pub response_threshold: u32,
    pub state: RequestContextState,

    // Round bookkeeping, owned by the scheduler.
    /// Rounds dispatched so far
    pub batch_counter: u64,
    /// Height the current (or last) round was dispatched at
    pub batch_height: BlockHeight,
    /// Requests issued in the current round
    pub batch_request_count: u32,
    /// Responses received in the current round
    pub responded_count: u32,
    /// Requests of the current round that timed out
    pub expired_count: u32,
    /// Whether the current round still has requests outstanding
    pub round_open: bool,
    /// Height the next round is queued for, if any
    pub scheduled_height: Option<BlockHeight>,
}

impl RequestContext {
    /// Threshold actually applied: zero means every issued request.
    pub fn effective_threshold(&self) -> u32 {
        if self.response_threshold == 0 {
            self.batch_request_count
        } else {
            self.response_threshold.min(self.batch_request_count)
        }
    }

    /// True once the configured number of rounds has been dispatched.
    pub fn rounds_exhausted(&self) -> bool {
        !self.repeated
            || (self.repeated_total != UNLIMITED_REPEATS
                && self.batch_counter >= self.repeated_total as u64)
    }

    /// Rounds still to be dispatched, `None` when unlimited.
    pub fn remaining_rounds(&self) -> Option<u64> {
        if !self.repeated {
            return Some(if self.batch_counter == 0 { 1 } else { 0 });
        }
        if self.repeated_total == UNLIMITED_REPEATS {
            return None;
        }
        Some((self.repeated_total as u64).saturating_sub(self.batch_counter))
    }

    /// Blocks between the starts of consecutive rounds.
    pub fn round_interval(&self) -> u64 {
        if self.repeated_frequency == 0 {
            self.timeout
        } else {
            self.repeated_frequency
        }
    }
}

/// Identifier of a single request: context id, round, dispatch height and
/// provider index, hex-encoded as 100 characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId {
    pub context_id: RequestContextId,
    pub batch_counter: u64,
    pub request_height: BlockHeight,
    pub index: u16,
}

impl RequestId {
    pub fn to_bytes(&self) -> [u8; REQUEST_ID_LEN] {
        let mut out = [0u8; REQUEST_ID_LEN];
        out[..32].copy_from_slice(&self.context_id.0);
        out[32..40].copy_from_slice(&self.batch_counter.to_be_bytes());
        out[40..48].copy_from_slice(&self.request_height.to_be_bytes());
        out[48..50].copy_from_slice(&self.index.to_be_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse the hex form.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        if !s.is_ascii() {
            return Err(CryptoError::InvalidHex(s.to_string()));
        }
        if s.len() != REQUEST_ID_LEN * 2 {
            return Err(CryptoError::InvalidLength {
                expected: REQUEST_ID_LEN * 2,
                actual: s.len(),
            });
        }
        let context_id = Hash::from_hex(&s[..REQUEST_CONTEXT_ID_LEN * 2])?;
        let batch_counter = parse_u64(&s[64..80])?;
        let request_height = parse_u64(&s[80..96])?;
        let index = u16::from_str_radix(&s[96..100], 16)
            .map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Ok(Self {
            context_id,
            batch_counter,
            request_height,
            index,
        })
    }
}

fn parse_u64(s: &str) -> Result<u64, CryptoError> {
    u64::from_str_radix(s, 16).map_err(|e| CryptoError::InvalidHex(e.to_string()))
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.to_hex())
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RequestId::from_hex(&s).map_err(D::Error::custom)
    }
}

/// A pending request to one provider for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub request_context_id: RequestContextId,
    pub batch_counter: u64,
    pub service_name: String,
    pub provider: Address,
    pub consumer: Address,
    pub input: String,
    /// Fee escrowed for this request
    pub service_fee: Coins,
    pub super_mode: bool,
    pub request_height: BlockHeight,
    pub expiration_height: BlockHeight,
}

/// Result header of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseResult {
    pub code: u16,
    pub message: String,
}

impl ResponseResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            code: RESULT_CODE_OK,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == RESULT_CODE_OK
    }
}

/// A provider's answer to a request, kept until its round completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: RequestId,
    pub request_context_id: RequestContextId,
    pub batch_counter: u64,
    pub provider: Address,
    pub consumer: Address,
    pub result: ResponseResult,
    pub output: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_crypto::{tagged_hash, DOMAIN_REQUEST_CONTEXT};

    fn request_id() -> RequestId {
        RequestId {
            context_id: tagged_hash(DOMAIN_REQUEST_CONTEXT, &[b"ctx"]),
            batch_counter: 3,
            request_height: 42,
            index: 7,
        }
    }

    #[test]
    fn test_request_id_hex_roundtrip() {
        let id = request_id();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 100);
        assert_eq!(RequestId::from_hex(&hex).unwrap(), id);
    }

    #[test]
    fn test_request_id_rejects_bad_hex() {
        assert!(RequestId::from_hex("00").is_err());
        let bad = "g".repeat(100);
        assert!(RequestId::from_hex(&bad).is_err());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RequestContextState::BatchRunning.to_string(), "BATCHRUNNING");
        assert_eq!(RequestContextState::BatchCompleted.to_string(), "BATCHCOMPLETED");
        assert!(RequestContextState::Completed.is_terminal());
        assert!(!RequestContextState::Paused.is_pausable());
    }

    #[test]
    fn test_state_serde_name() {
        let json = serde_json::to_string(&RequestContextState::BatchRunning).unwrap();
        assert_eq!(json, "\"BATCH_RUNNING\"");
    }

    #[test]
    fn test_response_result_success() {
        assert!(ResponseResult::ok("fine").is_success());
        assert!(!ResponseResult {
            code: 500,
            message: "boom".into()
        }
        .is_success());
    }
}
