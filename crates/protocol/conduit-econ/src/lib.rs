//! Pricing, deposit and fee rules for the Conduit service module.
//!
//! - **Pricing**: parse a provider's pricing document into minimal units,
//!   validate its promotions, and compute the price in effect for a consumer
//! - **Deposits**: the minimum deposit a binding must hold
//! - **Fees**: per-provider fee caps and the service fee tax split
//!
//! Nothing here touches the store; every function is pure.
//!
//! # Example
//!
//! ```
//! use conduit_econ::{effective_price, min_deposit, parse_pricing, NativeOnly};
//! use conduit_types::{Coins, ServiceParams};
//!
//! let pricing = parse_pricing(
//!     r#"{"price":"10acdt","promotions_by_volume":[{"volume":5,"discount":"0.5"}]}"#,
//!     &NativeOnly,
//! )
//! .unwrap();
//!
//! assert_eq!(effective_price(&pricing, 0, 4), Coins::single("acdt", 10));
//! assert_eq!(effective_price(&pricing, 0, 5), Coins::single("acdt", 5));
//!
//! let params = ServiceParams::default().with_min_deposit_multiple(2).with_min_deposit_amount(0);
//! assert_eq!(min_deposit(&pricing, &params), Coins::single("acdt", 20));
//! ```

pub mod decimal;
pub mod deposit;
pub mod error;
pub mod fees;
pub mod pricing;
pub mod registry;

pub use decimal::{parse_decimal_truncated, parse_discount_ppm};
pub use deposit::{meets_min_deposit, min_deposit};
pub use error::{EconError, EconResult};
pub use fees::{fee_within_cap, per_provider_cap, split_tax};
pub use pricing::{discount_ppm, effective_price, parse_price, parse_pricing};
pub use registry::{resolve_unit, NativeOnly, TokenInfo, TokenRegistry};
