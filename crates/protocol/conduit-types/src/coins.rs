//! Multi-denomination amounts.
//!
//! [`Coins`] is a sorted map from denomination to a non-zero amount. The
//! canonical text form is `100acdt,5uusdt` with denominations in ascending
//! order; that form is also what serde reads and writes.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::Amount;

/// Errors from parsing a coin string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoinsError {
    /// Entry has no leading digits or no denomination
    #[error("malformed coin '{0}'")]
    Malformed(String),

    /// Denomination does not match the allowed pattern
    #[error("invalid denomination '{0}'")]
    InvalidDenom(String),

    /// Amount does not fit in 128 bits
    #[error("amount overflow in '{0}'")]
    Overflow(String),

    /// Same denomination listed twice
    #[error("duplicate denomination '{0}'")]
    DuplicateDenom(String),
}

/// Check that a denomination is 3-128 chars, starts with a lowercase
/// letter and continues with lowercase letters, digits or `/:._-`.
pub fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (3..=128).contains(&denom.len())
        && first.is_ascii_lowercase()
        && chars.all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '/' | ':' | '.' | '_' | '-')
        })
}

/// A set of amounts keyed by denomination.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Coins(BTreeMap<String, Amount>);

impl Coins {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-denomination amount. Zero yields the empty set.
    pub fn single(denom: impl Into<String>, amount: Amount) -> Self {
        let mut coins = Self::new();
        if amount > 0 {
            coins.0.insert(denom.into(), amount);
        }
        coins
    }

    /// Amount held in `denom` (zero when absent).
    pub fn amount_of(&self, denom: &str) -> Amount {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(denom, amount)` in denomination order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.0.iter().map(|(d, a)| (d.as_str(), *a))
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Sum of two sets. `None` on overflow.
    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            let entry = out.0.entry(denom.to_string()).or_insert(0);
            *entry = entry.checked_add(amount)?;
        }
        Some(out)
    }

    /// Difference of two sets. `None` if any denomination would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            let have = out.amount_of(denom);
            let left = have.checked_sub(amount)?;
            if left == 0 {
                out.0.remove(denom);
            } else {
                out.0.insert(denom.to_string(), left);
            }
        }
        Some(out)
    }

    /// True if every denomination of `other` is covered by `self`.
    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|(denom, amount)| self.amount_of(denom) >= amount)
    }

    /// Multiply every amount by `factor`. `None` on overflow.
    pub fn checked_mul(&self, factor: Amount) -> Option<Coins> {
        let mut out = Coins::new();
        for (denom, amount) in self.iter() {
            let scaled = amount.checked_mul(factor)?;
            if scaled > 0 {
                out.0.insert(denom.to_string(), scaled);
            }
        }
        Some(out)
    }

    /// Scale every amount by `ppm / 1_000_000`, truncating.
    pub fn mul_ppm_truncated(&self, ppm: u32) -> Coins {
        let mut out = Coins::new();
        for (denom, amount) in self.iter() {
            // Split to avoid overflow on large amounts.
            let whole = (amount / 1_000_000) * ppm as Amount;
            let frac = (amount % 1_000_000) * ppm as Amount / 1_000_000;
            let scaled = whole + frac;
            if scaled > 0 {
                out.0.insert(denom.to_string(), scaled);
            }
        }
        out
    }

    /// Divide every amount by `n`, truncating. Division by zero yields the empty set.
    pub fn div_truncated(&self, n: u64) -> Coins {
        if n == 0 {
            return Coins::new();
        }
        let mut out = Coins::new();
        for (denom, amount) in self.iter() {
            let part = amount / n as Amount;
            if part > 0 {
                out.0.insert(denom.to_string(), part);
            }
        }
        out
    }

    /// Per-denomination maximum of two sets.
    pub fn max(&self, other: &Coins) -> Coins {
        let mut out = self.clone();
        for (denom, amount) in other.iter() {
            let entry = out.0.entry(denom.to_string()).or_insert(0);
            *entry = (*entry).max(amount);
        }
        out
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (denom, amount) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}{}", amount, denom)?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Coins({})", self)
    }
}

impl FromStr for Coins {
    type Err = CoinsError;

    /// Parse `100acdt,5uusdt`. Whitespace around entries is ignored; the
    /// empty string is the empty set. Zero entries are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut coins = Coins::new();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(coins);
        }
        let mut seen = std::collections::BTreeSet::new();
        for entry in trimmed.split(',') {
            let entry = entry.trim();
            let split = entry
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| CoinsError::Malformed(entry.to_string()))?;
            if split == 0 {
                return Err(CoinsError::Malformed(entry.to_string()));
            }
            let (digits, denom) = entry.split_at(split);
            if !is_valid_denom(denom) {
                return Err(CoinsError::InvalidDenom(denom.to_string()));
            }
            if !seen.insert(denom.to_string()) {
                return Err(CoinsError::DuplicateDenom(denom.to_string()));
            }
            let amount: Amount = digits
                .parse()
                .map_err(|_| CoinsError::Overflow(entry.to_string()))?;
            if amount > 0 {
                coins.0.insert(denom.to_string(), amount);
            }
        }
        Ok(coins)
    }
}

impl Serialize for Coins {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Coins {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl FromIterator<(String, Amount)> for Coins {
    fn from_iter<I: IntoIterator<Item = (String, Amount)>>(iter: I) -> Self {
        let mut coins = Coins::new();
        for (denom, amount) in iter {
            if amount > 0 {
                *coins.0.entry(denom).or_insert(0) += amount;
            }
        }
        coins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(s: &str) -> Coins {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_sorted() {
        let c = coins("5uusdt, 100acdt");
        assert_eq!(c.to_string(), "100acdt,5uusdt");
        assert_eq!(c.amount_of("acdt"), 100);
        assert_eq!(c.amount_of("missing"), 0);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!("acdt".parse::<Coins>(), Err(CoinsError::Malformed(_))));
        assert!(matches!("100".parse::<Coins>(), Err(CoinsError::Malformed(_))));
        assert!(matches!("10A".parse::<Coins>(), Err(CoinsError::InvalidDenom(_))));
        assert!(matches!(
            "1acdt,2acdt".parse::<Coins>(),
            Err(CoinsError::DuplicateDenom(_))
        ));
        assert!(matches!(
            "999999999999999999999999999999999999999999acdt".parse::<Coins>(),
            Err(CoinsError::Overflow(_))
        ));
    }

    #[test]
    fn test_zero_entries_dropped() {
        assert!(coins("0acdt").is_zero());
        assert!(coins("").is_zero());
        assert!(Coins::single("acdt", 0).is_zero());
    }

    #[test]
    fn test_add_sub() {
        let a = coins("100acdt,5uusdt");
        let b = coins("40acdt");
        assert_eq!(a.checked_add(&b).unwrap(), coins("140acdt,5uusdt"));
        assert_eq!(a.checked_sub(&b).unwrap(), coins("60acdt,5uusdt"));
        assert_eq!(a.checked_sub(&coins("5uusdt")).unwrap(), coins("100acdt"));
        assert!(b.checked_sub(&a).is_none());
    }

    #[test]
    fn test_is_all_gte() {
        let a = coins("100acdt,5uusdt");
        assert!(a.is_all_gte(&coins("100acdt")));
        assert!(a.is_all_gte(&Coins::new()));
        assert!(!a.is_all_gte(&coins("1uatom")));
        assert!(!coins("99acdt").is_all_gte(&coins("100acdt")));
    }

    #[test]
    fn test_ppm_and_division_truncate() {
        let a = coins("999acdt");
        assert_eq!(a.mul_ppm_truncated(100_000), coins("99acdt"));
        assert_eq!(a.div_truncated(2), coins("499acdt"));
        assert!(coins("1acdt").div_truncated(2).is_zero());
        assert!(a.div_truncated(0).is_zero());
    }

    #[test]
    fn test_mul_ppm_large_amount() {
        let big = Coins::single("acdt", u128::MAX);
        let full = big.mul_ppm_truncated(1_000_000);
        assert!(full.amount_of("acdt") <= u128::MAX);
        assert!(full.amount_of("acdt") > u128::MAX / 2);
    }

    #[test]
    fn test_max_per_denom() {
        let a = coins("10acdt,1uusdt");
        let b = coins("5acdt,3uusdt,2uatom");
        assert_eq!(a.max(&b), coins("10acdt,2uatom,3uusdt"));
    }

    #[test]
    fn test_serde_string_form() {
        let c = coins("7acdt");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"7acdt\"");
        let back: Coins = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
