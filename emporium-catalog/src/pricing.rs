use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::discount::{Discount, DiscountId, DiscountRecords, IgnoredDiscount};
use crate::product::{Product, ProductId};
use crate::to_money;

/// Which discount records take part in the price calculation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountWindowPolicy {
    /// Every record attached to the product is applied, whatever its window.
    #[default]
    ApplyAll,
    /// Only records whose window contains `now` are applied.
    ActiveOnly,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub window_policy: DiscountWindowPolicy,
}

/// Breakdown of an effective price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub product_id: ProductId,
    pub base_price: Decimal,
    /// `None` when no discount applies, which is not the same as a price of zero.
    pub effective_price: Option<Decimal>,
    /// Discounts in the order they were applied.
    pub applied: Vec<DiscountId>,
}

/// Sale price calculator. Pure: reads only its arguments.
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Applies `discounts` in id order to the product's base price.
    ///
    /// Percentages compound on the running price. The result is floored at
    /// zero and returned at 2 decimal places.
    pub fn get_discounted_price(
        &self,
        product: &Product,
        discounts: &[Discount],
        now: DateTime<Utc>,
    ) -> Option<Decimal> {
        self.quote(product, discounts, now).effective_price
    }

    pub fn quote(&self, product: &Product, discounts: &[Discount], now: DateTime<Utc>) -> PriceQuote {
        self.price_chain(product, discounts, &[], now)
    }

    /// Like [`quote`](Self::quote), but ignored records still count as
    /// attached: a product whose only records are ignored prices at its base
    /// price rather than `None`.
    pub fn quote_records(&self, product: &Product, records: &DiscountRecords, now: DateTime<Utc>) -> PriceQuote {
        self.price_chain(product, &records.discounts, &records.ignored, now)
    }

    fn in_window(&self, active: bool) -> bool {
        match self.config.window_policy {
            DiscountWindowPolicy::ApplyAll => true,
            DiscountWindowPolicy::ActiveOnly => active,
        }
    }

    fn price_chain(
        &self,
        product: &Product,
        discounts: &[Discount],
        ignored: &[IgnoredDiscount],
        now: DateTime<Utc>,
    ) -> PriceQuote {
        let mut chain: Vec<&Discount> = discounts.iter().filter(|d| self.in_window(d.is_active(now))).collect();
        chain.sort_by_key(|d| d.id);
        let has_ignored = ignored.iter().any(|d| self.in_window(d.is_active(now)));

        if chain.is_empty() && !has_ignored {
            return PriceQuote {
                product_id: product.id,
                base_price: product.price,
                effective_price: None,
                applied: Vec::new(),
            };
        }

        let price = chain.iter().fold(product.price, |running, d| d.apply(running));

        PriceQuote {
            product_id: product.id,
            base_price: product.price,
            effective_price: Some(to_money(price.max(Decimal::ZERO))),
            applied: chain.iter().map(|d| d.id).collect(),
        }
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
