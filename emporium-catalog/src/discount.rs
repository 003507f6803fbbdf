use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::product::ProductId;
use crate::{validate_amount, CatalogError, CatalogResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountId(pub i64);

impl fmt::Display for DiscountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Takes `value` percent off the running price.
    Percentage,
    /// Subtracts `value` from the running price.
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl FromStr for DiscountType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(CatalogError::UnknownDiscountType(other.to_string())),
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-bounded price reduction attached to a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub product_id: ProductId,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl Discount {
    /// Validates the amount and rejects windows that end before they start.
    pub fn new(
        id: DiscountId,
        product_id: ProductId,
        discount_type: DiscountType,
        value: Decimal,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> CatalogResult<Self> {
        if start_date > end_date {
            return Err(CatalogError::InvertedDiscountWindow {
                start: start_date.to_rfc3339(),
                end: end_date.to_rfc3339(),
            });
        }
        let value = validate_amount("discount value", value)?;

        Ok(Self {
            id,
            product_id,
            discount_type,
            value,
            start_date,
            end_date,
        })
    }

    /// Both ends of the window are inclusive.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    /// Applies this discount to the running price. May go negative; the
    /// caller clamps once the whole chain has been applied.
    pub fn apply(&self, price: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Percentage => price - price * (self.value / Decimal::ONE_HUNDRED),
            DiscountType::Fixed => price - self.value,
        }
    }
}

/// A stored discount row that could not be read as a [`Discount`], either
/// because its type is unknown or because its window is inverted.
///
/// It still counts as a record attached to the product but never changes
/// the price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredDiscount {
    pub id: DiscountId,
    pub product_id: ProductId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl IgnoredDiscount {
    /// Same inclusive test as [`Discount::is_active`]; an inverted window is
    /// never active.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}

/// Every discount record loaded for one product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscountRecords {
    pub discounts: Vec<Discount>,
    pub ignored: Vec<IgnoredDiscount>,
}

impl DiscountRecords {
    pub fn len(&self) -> usize {
        self.discounts.len() + self.ignored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<Discount>> for DiscountRecords {
    fn from(discounts: Vec<Discount>) -> Self {
        Self {
            discounts,
            ignored: Vec::new(),
        }
    }
}
