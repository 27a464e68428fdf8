//! Provider deposit rules.

use conduit_types::{Amount, Coins, Pricing, ServiceParams};

/// Minimum deposit for a binding with the given pricing.
///
/// `max(native_price × min_deposit_multiple, min_deposit)`, evaluated per
/// denomination. Only the native part of the price scales the deposit.
///
/// # Example
/// ```
/// use conduit_econ::min_deposit;
/// use conduit_types::{Coins, Pricing, ServiceParams};
///
/// let params = ServiceParams::default()
///     .with_min_deposit_multiple(2)
///     .with_min_deposit_amount(0);
/// let pricing = Pricing { price: Coins::single("acdt", 10), ..Default::default() };
/// assert_eq!(min_deposit(&pricing, &params), Coins::single("acdt", 20));
/// ```
pub fn min_deposit(pricing: &Pricing, params: &ServiceParams) -> Coins {
    let native = pricing.price.amount_of(&params.base_denom);
    let scaled = native.saturating_mul(params.min_deposit_multiple as Amount);
    Coins::single(params.base_denom.clone(), scaled).max(&params.min_deposit)
}

/// Whether `deposit` satisfies the minimum for `pricing`.
pub fn meets_min_deposit(deposit: &Coins, pricing: &Pricing, params: &ServiceParams) -> bool {
    deposit.is_all_gte(&min_deposit(pricing, params))
}
