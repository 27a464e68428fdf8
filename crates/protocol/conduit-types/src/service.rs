//! Service definitions, provider bindings and parsed pricing.

use conduit_crypto::Address;
use serde::{Deserialize, Serialize};

use crate::{Coins, Timestamp};

/// An immutable service definition.
///
/// `schemas` is the raw JSON document `{"input": .., "output": .., "error": ..}`
/// where each member is a JSON Schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub author: Address,
    pub author_description: String,
    pub schemas: String,
}

/// A provider's binding to a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBinding {
    pub service_name: String,
    pub provider: Address,
    pub deposit: Coins,
    /// Raw pricing JSON as submitted by the provider
    pub pricing: String,
    pub available: bool,
    /// Block time the binding was disabled; zero while available
    pub disabled_time: Timestamp,
}

impl ServiceBinding {
    /// Earliest block time at which the deposit may be refunded.
    pub fn refundable_at(&self, arbitration_time_limit_ms: u64, complaint_retrospect_ms: u64) -> Timestamp {
        self.disabled_time
            .saturating_add(arbitration_time_limit_ms)
            .saturating_add(complaint_retrospect_ms)
    }
}

/// A time-window discount. Active for `start_time <= now < end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionByTime {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Price multiplier in parts per million, `(0, 1_000_000]`
    pub discount_ppm: u32,
}

/// A volume-tier discount. Applies once a consumer has sent at least
/// `volume` requests to the same provider for the same service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionByVolume {
    pub volume: u64,
    /// Price multiplier in parts per million, `(0, 1_000_000]`
    pub discount_ppm: u32,
}

/// Parsed pricing, recomputed whenever a binding's raw pricing changes.
///
/// `price` is expressed in minimal units (base denominations).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub price: Coins,
    #[serde(default)]
    pub promotions_by_time: Vec<PromotionByTime>,
    #[serde(default)]
    pub promotions_by_volume: Vec<PromotionByVolume>,
}
