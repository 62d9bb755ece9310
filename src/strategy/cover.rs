//! Cover-loss overlay.
//!
//! Sizes a wager so that winning it recovers the accumulated loss plus one
//! base bet of profit at the payout multiplier the bet is placed at.

use rust_decimal::prelude::*;

/// Smallest wager `w` with `w × (multiplier − 1) ≥ loss + margin`.
///
/// Returns `None` when nothing is owed or when the multiplier cannot produce
/// a profit (≤ 1).
pub fn cover_wager(loss: u64, margin: u64, multiplier: Decimal) -> Option<u64> {
    if loss == 0 {
        return None;
    }
    let net_odds = multiplier - Decimal::ONE;
    if net_odds <= Decimal::ZERO {
        return None;
    }
    let needed = Decimal::from(loss.saturating_add(margin));
    Some(
        needed
            .checked_div(net_odds)
            .map(|w| w.ceil().to_u64().unwrap_or(u64::MAX))
            .unwrap_or(u64::MAX),
    )
}
