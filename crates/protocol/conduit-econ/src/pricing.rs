//! Pricing documents.
//!
//! Providers submit pricing as JSON:
//! ```json
//! {
//!   "price": "1.5cdt,2usdt",
//!   "promotions_by_time": [
//!     {"start_time": "2026-01-01T00:00:00Z", "end_time": "2026-02-01T00:00:00Z", "discount": "0.8"}
//!   ],
//!   "promotions_by_volume": [{"volume": 100, "discount": "0.9"}]
//! }
//! ```
//! Parsing converts every price entry to minimal units, truncating.

use chrono::{DateTime, Utc};
use conduit_types::{Coins, Pricing, PromotionByTime, PromotionByVolume, Timestamp};
use serde::Deserialize;

use crate::decimal::{parse_decimal_truncated, parse_discount_ppm};
use crate::error::{EconError, EconResult};
use crate::registry::{resolve_unit, TokenRegistry};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPricing {
    price: String,
    #[serde(default)]
    promotions_by_time: Vec<RawPromotionByTime>,
    #[serde(default)]
    promotions_by_volume: Vec<RawPromotionByVolume>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPromotionByTime {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    discount: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPromotionByVolume {
    volume: u64,
    discount: String,
}

/// Parse and validate a pricing document.
///
/// # Errors
/// - `MalformedPricing` if the JSON does not match the expected shape
/// - `MalformedPrice` / `InvalidDecimal` for bad price entries
/// - `UnknownUnit` if a unit cannot be resolved
/// - `InvalidDiscount`, `InvalidTimePromotion`, `InvalidVolumePromotion`
///   for bad promotions
pub fn parse_pricing<R: TokenRegistry + ?Sized>(raw: &str, registry: &R) -> EconResult<Pricing> {
    let doc: RawPricing =
        serde_json::from_str(raw).map_err(|e| EconError::MalformedPricing(e.to_string()))?;

    let price = parse_price(&doc.price, registry)?;

    let promotions_by_time = doc
        .promotions_by_time
        .iter()
        .map(|p| {
            Ok(PromotionByTime {
                start_time: to_millis(&p.start_time)?,
                end_time: to_millis(&p.end_time)?,
                discount_ppm: parse_discount_ppm(&p.discount)?,
            })
        })
        .collect::<EconResult<Vec<_>>>()?;
    validate_time_promotions(&promotions_by_time)?;

    let promotions_by_volume = doc
        .promotions_by_volume
        .iter()
        .map(|p| {
            Ok(PromotionByVolume {
                volume: p.volume,
                discount_ppm: parse_discount_ppm(&p.discount)?,
            })
        })
        .collect::<EconResult<Vec<_>>>()?;
    validate_volume_promotions(&promotions_by_volume)?;

    Ok(Pricing {
        price,
        promotions_by_time,
        promotions_by_volume,
    })
}

/// Parse a comma-separated price list such as `1.5cdt,2usdt`.
///
/// Entries in the same denomination are summed.
pub fn parse_price<R: TokenRegistry + ?Sized>(price: &str, registry: &R) -> EconResult<Coins> {
    let mut coins = Coins::new();
    for entry in price.split(',') {
        let entry = entry.trim();
        let split = entry
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| EconError::MalformedPrice(entry.to_string()))?;
        let (amount, unit) = entry.split_at(split);
        if amount.is_empty() {
            return Err(EconError::MalformedPrice(entry.to_string()));
        }
        let token = resolve_unit(registry, unit).ok_or_else(|| EconError::UnknownUnit(unit.to_string()))?;
        let minimal = parse_decimal_truncated(amount, token.decimals)?;
        coins = coins
            .checked_add(&Coins::single(token.denom, minimal))
            .ok_or(EconError::Overflow)?;
    }
    Ok(coins)
}

fn to_millis(t: &DateTime<Utc>) -> EconResult<Timestamp> {
    u64::try_from(t.timestamp_millis())
        .map_err(|_| EconError::InvalidTimePromotion(format!("{} is before the epoch", t)))
}

fn validate_time_promotions(promotions: &[PromotionByTime]) -> EconResult<()> {
    for (i, p) in promotions.iter().enumerate() {
        if p.start_time >= p.end_time {
            return Err(EconError::InvalidTimePromotion(format!(
                "promotion {} ends before it starts",
                i
            )));
        }
        if i > 0 && promotions[i - 1].end_time > p.start_time {
            return Err(EconError::InvalidTimePromotion(format!(
                "promotion {} overlaps its predecessor",
                i
            )));
        }
    }
    Ok(())
}

fn validate_volume_promotions(promotions: &[PromotionByVolume]) -> EconResult<()> {
    for (i, p) in promotions.iter().enumerate() {
        if p.volume == 0 {
            return Err(EconError::InvalidVolumePromotion(format!(
                "promotion {} has zero volume",
                i
            )));
        }
        if i > 0 && promotions[i - 1].volume >= p.volume {
            return Err(EconError::InvalidVolumePromotion(format!(
                "promotion {} is not above its predecessor",
                i
            )));
        }
    }
    Ok(())
}

/// Discount in effect at `now` for a consumer with `volume` prior requests.
///
/// An active time promotion wins over volume tiers. Returns ppm, where
/// 1_000_000 means full price.
pub fn discount_ppm(pricing: &Pricing, now: Timestamp, volume: u64) -> u32 {
    if let Some(p) = pricing
        .promotions_by_time
        .iter()
        .find(|p| p.start_time <= now && now < p.end_time)
    {
        return p.discount_ppm;
    }
    pricing
        .promotions_by_volume
        .iter()
        .rev()
        .find(|p| p.volume <= volume)
        .map(|p| p.discount_ppm)
        .unwrap_or(conduit_types::constants::PPM)
}

/// Price actually charged at `now` for a consumer with `volume` prior requests.
pub fn effective_price(pricing: &Pricing, now: Timestamp, volume: u64) -> Coins {
    pricing
        .price
        .mul_ppm_truncated(discount_ppm(pricing, now, volume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NativeOnly, TokenInfo};

    struct Tokens;

    impl TokenRegistry for Tokens {
        fn resolve_unit(&self, unit: &str) -> Option<TokenInfo> {
            match unit {
                "usdt" => Some(TokenInfo::new("uusdt", 6)),
                "btc" => Some(TokenInfo::new("sat", 8)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_parse_native_price() {
        let pricing = parse_pricing(r#"{"price":"1.5cdt"}"#, &NativeOnly).unwrap();
        assert_eq!(
            pricing.price.amount_of("acdt"),
            1_500_000_000_000_000_000
        );
        assert!(pricing.promotions_by_time.is_empty());
    }

    #[test]
    fn test_parse_base_denom_price() {
        let pricing = parse_pricing(r#"{"price":"10acdt"}"#, &NativeOnly).unwrap();
        assert_eq!(pricing.price, Coins::single("acdt", 10));
    }

    #[test]
    fn test_parse_multi_unit_truncates() {
        let pricing = parse_pricing(r#"{"price":"0.0000019usdt, 2btc"}"#, &Tokens).unwrap();
        assert_eq!(pricing.price.amount_of("uusdt"), 1);
        assert_eq!(pricing.price.amount_of("sat"), 200_000_000);
    }

    #[test]
    fn test_same_unit_summed() {
        let price = parse_price("1acdt,2acdt", &NativeOnly).unwrap();
        assert_eq!(price, Coins::single("acdt", 3));
    }

    #[test]
    fn test_unknown_unit() {
        assert_eq!(
            parse_pricing(r#"{"price":"1doge"}"#, &NativeOnly),
            Err(EconError::UnknownUnit("doge".into()))
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(
            parse_pricing("not json", &NativeOnly),
            Err(EconError::MalformedPricing(_))
        ));
        assert!(matches!(
            parse_pricing(r#"{"price":"1cdt","extra":1}"#, &NativeOnly),
            Err(EconError::MalformedPricing(_))
        ));
        assert!(matches!(
            parse_pricing(r#"{"price":""}"#, &NativeOnly),
            Err(EconError::MalformedPrice(_))
        ));
        assert!(matches!(
            parse_pricing(r#"{"price":"cdt"}"#, &NativeOnly),
            Err(EconError::MalformedPrice(_))
        ));
        assert!(matches!(
            parse_pricing(r#"{"price":"1..2cdt"}"#, &NativeOnly),
            Err(EconError::InvalidDecimal(_))
        ));
    }

    #[test]
    fn test_time_promotions_must_be_ordered() {
        let overlapping = r#"{"price":"1cdt","promotions_by_time":[
            {"start_time":"2026-01-01T00:00:00Z","end_time":"2026-01-10T00:00:00Z","discount":"0.5"},
            {"start_time":"2026-01-05T00:00:00Z","end_time":"2026-01-20T00:00:00Z","discount":"0.8"}]}"#;
        assert!(matches!(
            parse_pricing(overlapping, &NativeOnly),
            Err(EconError::InvalidTimePromotion(_))
        ));

        let inverted = r#"{"price":"1cdt","promotions_by_time":[
            {"start_time":"2026-01-10T00:00:00Z","end_time":"2026-01-01T00:00:00Z","discount":"0.5"}]}"#;
        assert!(matches!(
            parse_pricing(inverted, &NativeOnly),
            Err(EconError::InvalidTimePromotion(_))
        ));
    }

    #[test]
    fn test_volume_promotions_must_ascend() {
        let doc = r#"{"price":"1cdt","promotions_by_volume":[
            {"volume":10,"discount":"0.9"},{"volume":10,"discount":"0.8"}]}"#;
        assert!(matches!(
            parse_pricing(doc, &NativeOnly),
            Err(EconError::InvalidVolumePromotion(_))
        ));
        let zero = r#"{"price":"1cdt","promotions_by_volume":[{"volume":0,"discount":"0.9"}]}"#;
        assert!(matches!(
            parse_pricing(zero, &NativeOnly),
            Err(EconError::InvalidVolumePromotion(_))
        ));
    }

    #[test]
    fn test_effective_price_time_beats_volume() {
        let doc = r#"{"price":"100acdt",
            "promotions_by_time":[{"start_time":"1970-01-01T00:00:01Z","end_time":"1970-01-01T00:00:02Z","discount":"0.5"}],
            "promotions_by_volume":[{"volume":2,"discount":"0.9"},{"volume":5,"discount":"0.7"}]}"#;
        let pricing = parse_pricing(doc, &NativeOnly).unwrap();

        // inside the time window
        assert_eq!(effective_price(&pricing, 1_500, 10), Coins::single("acdt", 50));
        // end is exclusive
        assert_eq!(effective_price(&pricing, 2_000, 0), Coins::single("acdt", 100));
        // volume tiers
        assert_eq!(effective_price(&pricing, 5_000, 1), Coins::single("acdt", 100));
        assert_eq!(effective_price(&pricing, 5_000, 2), Coins::single("acdt", 90));
        assert_eq!(effective_price(&pricing, 5_000, 9), Coins::single("acdt", 70));
    }
}
