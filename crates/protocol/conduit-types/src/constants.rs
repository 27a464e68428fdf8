//! Service module constants.
//!
//! Hard protocol limits live here. Anything governance can change is a
//! field of [`ServiceParams`](crate::ServiceParams) instead; the defaults for
//! those fields are also defined here.

use crate::Amount;

// =============================================================================
// Denominations
// =============================================================================

/// Display unit of the native token
pub const NATIVE_UNIT: &str = "cdt";

/// Base (minimal) denomination of the native token
pub const NATIVE_BASE_DENOM: &str = "acdt";

/// Decimal exponent between [`NATIVE_UNIT`] and [`NATIVE_BASE_DENOM`]
pub const NATIVE_DECIMALS: u32 = 18;

/// One whole native token in base units
pub const NATIVE_SCALE: Amount = 1_000_000_000_000_000_000;

// =============================================================================
// Definition Limits
// =============================================================================

/// Maximum length of a service name (characters)
pub const MAX_NAME_LENGTH: usize = 70;

/// Maximum length of a description or author description (characters)
pub const MAX_DESCRIPTION_LENGTH: usize = 280;

/// Maximum number of tags per service definition
pub const MAX_TAGS_NUM: usize = 10;

/// Maximum length of a single tag (characters)
pub const MAX_TAG_LENGTH: usize = 70;

/// Maximum length of a module callback name
pub const MAX_MODULE_NAME_LENGTH: usize = 70;

// =============================================================================
// Request Limits
// =============================================================================

/// Maximum number of providers a request context may target
pub const MAX_PROVIDERS_NUM: usize = 10;

/// Length of a request context identifier (bytes)
pub const REQUEST_CONTEXT_ID_LEN: usize = 32;

/// Length of a request identifier (bytes): context id, batch, height, index
pub const REQUEST_ID_LEN: usize = REQUEST_CONTEXT_ID_LEN + 8 + 8 + 2;

/// Sentinel for a repeated context that never runs out of rounds
pub const UNLIMITED_REPEATS: i64 = -1;

/// Result code of a successful response
pub const RESULT_CODE_OK: u16 = 200;

// =============================================================================
// Economic Defaults
// =============================================================================

/// Parts-per-million denominator for discounts and tax rates
pub const PPM: u32 = 1_000_000;

/// Default multiple of the base price a provider must lock as deposit
pub const DEFAULT_MIN_DEPOSIT_MULTIPLE: u64 = 1000;

/// Default absolute deposit floor, in whole native tokens
pub const DEFAULT_MIN_DEPOSIT_TOKENS: Amount = 5000;

/// Default service fee tax: 10%
pub const DEFAULT_SERVICE_FEE_TAX_PPM: u32 = 100_000;

// =============================================================================
// Timing Defaults
// =============================================================================

/// One day in milliseconds
pub const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Default arbitration time limit: 5 days
pub const DEFAULT_ARBITRATION_TIME_LIMIT_MS: u64 = 5 * DAY_MS;

/// Default complaint retrospect window: 15 days
pub const DEFAULT_COMPLAINT_RETROSPECT_MS: u64 = 15 * DAY_MS;

/// Default maximum request timeout (blocks)
pub const DEFAULT_MAX_REQUEST_TIMEOUT: u64 = 100;

/// Default maximum size of input/output payloads (bytes)
pub const DEFAULT_TX_SIZE_LIMIT: usize = 4000;
