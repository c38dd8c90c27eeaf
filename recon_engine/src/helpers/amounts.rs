//! Amount totalling and tolerance comparison.
use recon_common::Money;

/// Sums a set of split amounts. Callers map their detail records down to the amount field; an order
/// without splits totals to zero.
pub fn split_total<I>(amounts: I) -> Money
where I: IntoIterator<Item = Money> {
    amounts.into_iter().sum()
}

/// True when the reported pay amount matches the computed total within `tolerance` (inclusive).
///
/// The computed total is `split_total + platform_income + pay_fee`.
pub fn amounts_balance(
    pay_amount: Money,
    platform_income: Money,
    pay_fee: Money,
    split_total: Money,
    tolerance: Money,
) -> bool {
    let calc = split_total + platform_income + pay_fee;
    (pay_amount - calc).abs() <= tolerance
}
