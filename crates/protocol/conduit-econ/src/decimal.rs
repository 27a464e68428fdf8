//! Truncating decimal-to-integer conversion.

use conduit_types::Amount;

use crate::error::{EconError, EconResult};

/// Convert a decimal string to minimal units with `decimals` fractional
/// digits, truncating any extra precision.
///
/// Accepts `123`, `1.5`, `0.000001`. Rejects signs, exponents, a leading or
/// trailing dot, and empty input.
///
/// # Example
/// ```
/// use conduit_econ::parse_decimal_truncated;
///
/// assert_eq!(parse_decimal_truncated("1.5", 2).unwrap(), 150);
/// assert_eq!(parse_decimal_truncated("0.129", 2).unwrap(), 12);
/// ```
pub fn parse_decimal_truncated(s: &str, decimals: u32) -> EconResult<Amount> {
    let invalid = || EconError::InvalidDecimal(s.to_string());

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if let Some(f) = frac_part {
        if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
    }

    let scale = 10u128.checked_pow(decimals).ok_or(EconError::Overflow)?;
    let whole: Amount = int_part.parse().map_err(|_| EconError::Overflow)?;
    let mut total = whole.checked_mul(scale).ok_or(EconError::Overflow)?;

    if let Some(f) = frac_part {
        let kept: String = f.chars().take(decimals as usize).collect();
        if !kept.is_empty() {
            let padded = format!("{:0<width$}", kept, width = decimals as usize);
            let frac: Amount = padded.parse().map_err(|_| EconError::Overflow)?;
            total = total.checked_add(frac).ok_or(EconError::Overflow)?;
        }
    }
    Ok(total)
}

/// Parse a discount in `(0, 1]` into parts per million, truncating beyond
/// six fractional digits.
pub fn parse_discount_ppm(s: &str) -> EconResult<u32> {
    let ppm = parse_decimal_truncated(s, 6).map_err(|_| EconError::InvalidDiscount(s.to_string()))?;
    if ppm == 0 || ppm > conduit_types::constants::PPM as Amount {
        return Err(EconError::InvalidDiscount(s.to_string()));
    }
    Ok(ppm as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_and_fraction() {
        assert_eq!(parse_decimal_truncated("7", 0).unwrap(), 7);
        assert_eq!(parse_decimal_truncated("7", 3).unwrap(), 7000);
        assert_eq!(parse_decimal_truncated("1.25", 3).unwrap(), 1250);
        assert_eq!(
            parse_decimal_truncated("1.5", 18).unwrap(),
            1_500_000_000_000_000_000
        );
    }

    #[test]
    fn test_truncates_extra_precision() {
        assert_eq!(parse_decimal_truncated("0.999", 2).unwrap(), 99);
        assert_eq!(parse_decimal_truncated("3.7", 0).unwrap(), 3);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", ".", "1.", ".5", "-1", "+1", "1e3", "1.2.3", "1,5", " 1"] {
            assert!(
                matches!(parse_decimal_truncated(bad, 6), Err(EconError::InvalidDecimal(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_overflow() {
        let huge = "9".repeat(40);
        assert_eq!(parse_decimal_truncated(&huge, 18), Err(EconError::Overflow));
    }

    #[test]
    fn test_discount_bounds() {
        assert_eq!(parse_discount_ppm("0.8").unwrap(), 800_000);
        assert_eq!(parse_discount_ppm("1").unwrap(), 1_000_000);
        assert!(parse_discount_ppm("0").is_err());
        assert!(parse_discount_ppm("0.0000001").is_err());
        assert!(parse_discount_ppm("1.01").is_err());
        assert!(parse_discount_ppm("abc").is_err());
    }
}
