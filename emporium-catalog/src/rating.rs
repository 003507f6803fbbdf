use rust_decimal::Decimal;

use crate::comment::Rating;
use crate::to_money;

/// Mean of `ratings` at 2 decimal places, rounded half to even.
///
/// An empty set yields `0.00`.
pub fn average_rating(ratings: &[Rating]) -> Decimal {
    if ratings.is_empty() {
        return to_money(Decimal::ZERO);
    }

    let sum: u64 = ratings.iter().map(|r| u64::from(r.value())).sum();
    let mean = Decimal::from(sum) / Decimal::from(ratings.len() as u64);
    to_money(mean)
}
