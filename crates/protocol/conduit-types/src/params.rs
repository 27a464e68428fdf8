//! Governance-controlled parameters of the service module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::{Amount, Coins};

/// A parameter value outside its allowed range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    /// Field must be greater than zero
    #[error("{0} must be positive")]
    NotPositive(&'static str),

    /// Tax rate of 100% or more
    #[error("service_fee_tax_ppm must be below 1000000, got {0}")]
    TaxTooHigh(u32),

    /// Field outside `1..=max`
    #[error("{field} must be within 1..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        max: usize,
    },

    /// Base denomination does not match the denom pattern
    #[error("invalid base_denom '{0}'")]
    InvalidBaseDenom(String),
}

/// Service module parameters.
///
/// Every field has a default, so a partial TOML document overrides only
/// what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceParams {
    /// Longest timeout (blocks) a request context may ask for
    pub max_request_timeout: u64,
    /// Deposit a provider must lock, as a multiple of its base price
    pub min_deposit_multiple: u64,
    /// Absolute deposit floor
    pub min_deposit: Coins,
    /// Share of each settled fee routed to the tax account (ppm)
    pub service_fee_tax_ppm: u32,
    /// Window after disabling during which complaints may still be raised (ms)
    pub complaint_retrospect_ms: u64,
    /// Time allowed to arbitrate a complaint (ms)
    pub arbitration_time_limit_ms: u64,
    /// Largest input or output payload (bytes)
    pub tx_size_limit: usize,
    pub max_providers_per_request: usize,
    pub max_service_name_length: usize,
    /// Base denomination of the native token
    pub base_denom: String,
}

impl Default for ServiceParams {
    fn default() -> Self {
        Self {
            max_request_timeout: DEFAULT_MAX_REQUEST_TIMEOUT,
            min_deposit_multiple: DEFAULT_MIN_DEPOSIT_MULTIPLE,
            min_deposit: Coins::single(
                NATIVE_BASE_DENOM,
                DEFAULT_MIN_DEPOSIT_TOKENS * NATIVE_SCALE,
            ),
            service_fee_tax_ppm: DEFAULT_SERVICE_FEE_TAX_PPM,
            complaint_retrospect_ms: DEFAULT_COMPLAINT_RETROSPECT_MS,
            arbitration_time_limit_ms: DEFAULT_ARBITRATION_TIME_LIMIT_MS,
            tx_size_limit: DEFAULT_TX_SIZE_LIMIT,
            max_providers_per_request: MAX_PROVIDERS_NUM,
            max_service_name_length: MAX_NAME_LENGTH,
            base_denom: NATIVE_BASE_DENOM.to_string(),
        }
    }
}

impl ServiceParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_request_timeout(mut self, blocks: u64) -> Self {
        self.max_request_timeout = blocks;
        self
    }

    pub fn with_min_deposit_multiple(mut self, multiple: u64) -> Self {
        self.min_deposit_multiple = multiple;
        self
    }

    pub fn with_min_deposit(mut self, floor: Coins) -> Self {
        self.min_deposit = floor;
        self
    }

    /// Set the deposit floor in base units of the native token.
    pub fn with_min_deposit_amount(mut self, amount: Amount) -> Self {
        self.min_deposit = Coins::single(self.base_denom.clone(), amount);
        self
    }

    pub fn with_service_fee_tax_ppm(mut self, ppm: u32) -> Self {
        self.service_fee_tax_ppm = ppm;
        self
    }

    pub fn with_refund_delays(mut self, arbitration_time_limit_ms: u64, complaint_retrospect_ms: u64) -> Self {
        self.arbitration_time_limit_ms = arbitration_time_limit_ms;
        self.complaint_retrospect_ms = complaint_retrospect_ms;
        self
    }

    pub fn with_tx_size_limit(mut self, bytes: usize) -> Self {
        self.tx_size_limit = bytes;
        self
    }

    pub fn with_max_providers_per_request(mut self, n: usize) -> Self {
        self.max_providers_per_request = n;
        self
    }

    /// Total delay between disabling a binding and refunding its deposit.
    pub fn refund_delay_ms(&self) -> u64 {
        self.arbitration_time_limit_ms
            .saturating_add(self.complaint_retrospect_ms)
    }

    /// Check parameter values are usable.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_request_timeout == 0 {
            return Err(ParamsError::NotPositive("max_request_timeout"));
        }
        if self.min_deposit_multiple == 0 {
            return Err(ParamsError::NotPositive("min_deposit_multiple"));
        }
        if self.service_fee_tax_ppm >= PPM {
            return Err(ParamsError::TaxTooHigh(self.service_fee_tax_ppm));
        }
        if self.tx_size_limit == 0 {
            return Err(ParamsError::NotPositive("tx_size_limit"));
        }
        if self.max_providers_per_request == 0 || self.max_providers_per_request > MAX_PROVIDERS_NUM {
            return Err(ParamsError::OutOfRange {
                field: "max_providers_per_request",
                value: self.max_providers_per_request,
                max: MAX_PROVIDERS_NUM,
            });
        }
        if self.max_service_name_length == 0 || self.max_service_name_length > MAX_NAME_LENGTH {
            return Err(ParamsError::OutOfRange {
                field: "max_service_name_length",
                value: self.max_service_name_length,
                max: MAX_NAME_LENGTH,
            });
        }
        if !crate::coins::is_valid_denom(&self.base_denom) {
            return Err(ParamsError::InvalidBaseDenom(self.base_denom.clone()));
        }
        Ok(())
    }
}
