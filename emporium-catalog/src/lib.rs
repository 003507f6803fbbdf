pub mod product;
pub mod comment;
pub mod discount;
pub mod rating;
pub mod pricing;

pub use product::{Product, ProductId};
pub use comment::{Comment, CommentId, NewComment, Rating};
pub use discount::{Discount, DiscountId, DiscountRecords, DiscountType, IgnoredDiscount};
pub use rating::average_rating;
pub use pricing::{DiscountWindowPolicy, PriceQuote, PricingConfig, PricingEngine};

use rust_decimal::Decimal;

/// Number of fractional digits carried by every monetary and rating value.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CatalogError {
    #[error("Rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),

    #[error("Unknown discount type: {0}")]
    UnknownDiscountType(String),

    #[error("Discount window is inverted: starts {start} after it ends {end}")]
    InvertedDiscountWindow { start: String, end: String },

    #[error("Invalid {field}: {value} (must be non-negative with at most 2 decimal places)")]
    InvalidAmount { field: &'static str, value: Decimal },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Checks a fixed-point amount (price, discount value) against the column rules.
pub fn validate_amount(field: &'static str, value: Decimal) -> CatalogResult<Decimal> {
    if (value.is_sign_negative() && !value.is_zero()) || value.scale() > MONEY_SCALE {
        return Err(CatalogError::InvalidAmount { field, value });
    }
    Ok(value)
}

/// Rounds half to even and pins the scale so `4` renders as `4.00`.
pub(crate) fn to_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(MONEY_SCALE);
    rounded.rescale(MONEY_SCALE);
    rounded
}
