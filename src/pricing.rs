//! Subscription pricing.
//!
//! Price = base monthly rate × term length × tier multiplier. The tier
//! table is static configuration: longer terms get a volume discount.

use rust_decimal::Decimal;

/// Bundled terms and their discount multipliers, in hundredths.
/// 1 month — full price, 3 — 5% off, 6 — 10% off, 12 — 15% off.
const TIERS: &[(u32, i64)] = &[(1, 100), (3, 95), (6, 90), (12, 85)];

/// Compute the total price for `months` at the given base monthly rate,
/// rounded to two decimals. `None` for terms outside the tier table.
pub fn quote(base_rate: Decimal, months: u32) -> Option<Decimal> {
    let (_, multiplier) = TIERS.iter().find(|(m, _)| *m == months)?;
    let price = base_rate * Decimal::from(months) * Decimal::new(*multiplier, 2);
    Some(price.round_dp(2))
}
