use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{to_money, validate_amount, CatalogResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog item with a base price and a denormalized average rating.
///
/// `average_rating` is owned by the rating maintainer; nothing else should
/// write it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub average_rating: Decimal,
    pub in_stock: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Builds an active, in-stock product with no ratings yet.
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        slug: impl Into<String>,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> CatalogResult<Self> {
        let price = validate_amount("price", price)?;
        Ok(Self {
            id,
            title: title.into(),
            slug: slug.into(),
            description: String::new(),
            price,
            average_rating: to_money(Decimal::ZERO),
            in_stock: true,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_rated(&self) -> bool {
        self.average_rating > Decimal::ZERO
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}
