//! Service fee arithmetic: fee caps and the tax split.

use conduit_types::Coins;

/// Share of a context's fee cap available to each of `providers` providers.
///
/// An empty cap means "no cap" and yields `None`.
pub fn per_provider_cap(cap: &Coins, providers: usize) -> Option<Coins> {
    if cap.is_zero() {
        return None;
    }
    Some(cap.div_truncated(providers.max(1) as u64))
}

/// Whether a provider charging `fee` may be addressed under `cap_share`.
pub fn fee_within_cap(fee: &Coins, cap_share: Option<&Coins>) -> bool {
    match cap_share {
        None => true,
        Some(share) => share.is_all_gte(fee),
    }
}

/// Split a settled fee into `(provider_income, tax)`.
///
/// Tax is truncated, so rounding dust stays with the provider.
pub fn split_tax(fee: &Coins, tax_ppm: u32) -> (Coins, Coins) {
    let tax = fee.mul_ppm_truncated(tax_ppm);
    // tax <= fee per denomination, so the subtraction cannot fail
    let income = fee.checked_sub(&tax).unwrap_or_default();
    (income, tax)
}
