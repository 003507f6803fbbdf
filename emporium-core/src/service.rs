use emporium_catalog::{Comment, CommentId, NewComment, PriceQuote, PricingEngine, Product, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::repository::{CatalogRepository, RepositoryError};
use crate::{CoreError, CoreResult};

/// Outcome of a full rating reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub products: usize,
    pub corrected: usize,
    pub failed: usize,
}

/// Keeps derived product fields consistent with their source records.
///
/// Every comment write goes through here so the average rating is
/// recomputed right after the row is stored or removed.
#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
    clock: Arc<dyn Clock>,
    pricing: Arc<PricingEngine>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>, clock: Arc<dyn Clock>, pricing: PricingEngine) -> Self {
        Self {
            repo,
            clock,
            pricing: Arc::new(pricing),
        }
    }

    pub async fn active_products(&self) -> CoreResult<Vec<Product>> {
        Ok(self.repo.list_active_products().await?)
    }

    pub async fn product(&self, id: ProductId) -> CoreResult<Product> {
        self.repo
            .find_product(id)
            .await?
            .ok_or(CoreError::ProductNotFound(id))
    }

    /// Stores a comment and refreshes the owning product's average.
    pub async fn add_comment(&self, comment: NewComment) -> CoreResult<Comment> {
        self.product(comment.product_id).await?;

        let stored = self.repo.insert_comment(&comment).await.map_err(|e| match e {
            RepositoryError::ProductNotFound(id) => CoreError::ProductNotFound(id),
            other => other.into(),
        })?;
        self.on_comment_saved(&stored).await?;
        Ok(stored)
    }

    /// Deletes a comment and refreshes the owning product's average.
    pub async fn remove_comment(&self, id: CommentId) -> CoreResult<Comment> {
        let removed = self
            .repo
            .remove_comment(id)
            .await?
            .ok_or(CoreError::CommentNotFound(id))?;
        self.on_comment_deleted(&removed).await?;
        Ok(removed)
    }

    pub async fn on_comment_saved(&self, comment: &Comment) -> CoreResult<Decimal> {
        debug!("Comment {} saved for product {}", comment.id, comment.product_id);
        self.recompute_average(comment.product_id).await
    }

    /// Must run after the row is gone so it drops out of the aggregate.
    pub async fn on_comment_deleted(&self, comment: &Comment) -> CoreResult<Decimal> {
        debug!("Comment {} deleted from product {}", comment.id, comment.product_id);
        self.recompute_average(comment.product_id).await
    }

    async fn recompute_average(&self, product_id: ProductId) -> CoreResult<Decimal> {
        let average = self.repo.refresh_average_rating(product_id).await.map_err(|e| match e {
            RepositoryError::ProductNotFound(id) => CoreError::ProductNotFound(id),
            other => other.into(),
        })?;
        info!("Average rating for product {} is now {}", product_id, average);
        Ok(average)
    }

    /// Effective sale price at the clock's current time, or `None` when no
    /// discount applies.
    pub async fn discounted_price(&self, product_id: ProductId) -> CoreResult<Option<Decimal>> {
        Ok(self.price_quote(product_id).await?.effective_price)
    }

    pub async fn price_quote(&self, product_id: ProductId) -> CoreResult<PriceQuote> {
        let product = self.product(product_id).await?;
        let records = self.repo.find_discounts_by_product(product_id).await?;
        let now = self.clock.now();

        let quote = self.pricing.quote_records(&product, &records, now);
        debug!(
            "Priced product {} at {:?} with {} discount(s)",
            product_id,
            quote.effective_price,
            quote.applied.len()
        );
        Ok(quote)
    }

    /// Recomputes the average of every product and reports how many were stale.
    pub async fn reconcile_ratings(&self) -> CoreResult<ReconcileReport> {
        let ids = self.repo.list_product_ids().await?;
        let mut report = ReconcileReport::default();

        for id in ids {
            let before = match self.repo.find_product(id).await {
                Ok(Some(product)) => product.average_rating,
                // deleted since the listing
                Ok(None) => continue,
                Err(e) => {
                    warn!("Failed to load product {}: {}", id, e);
                    report.failed += 1;
                    continue;
                }
            };
            report.products += 1;

            match self.repo.refresh_average_rating(id).await {
                Ok(after) if after != before => {
                    info!("Corrected average rating for product {}: {} -> {}", id, before, after);
                    report.corrected += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to refresh average rating for product {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Reconciled {} products ({} corrected, {} failed)",
            report.products, report.corrected, report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::memory::InMemoryCatalogRepository;
    use crate::testing::Forwarding;
    use chrono::{DateTime, Duration, Utc};
    use emporium_catalog::{
        Discount, DiscountId, DiscountType, DiscountWindowPolicy, IgnoredDiscount, PricingConfig, Rating,
    };
    use uuid::Uuid;

    async fn setup(price: Decimal) -> (Arc<InMemoryCatalogRepository>, CatalogService, DateTime<Utc>) {
        let now = Utc::now();
        let repo = Arc::new(InMemoryCatalogRepository::new());
        repo.add_product(Product::new(ProductId(1), "Kettle", "kettle", price, now).unwrap()).await;
        let service = CatalogService::new(repo.clone(), Arc::new(FixedClock(now)), PricingEngine::default());
        (repo, service, now)
    }

    fn review(value: i64) -> NewComment {
        NewComment::new(ProductId(1), Uuid::new_v4(), Rating::new(value).unwrap(), "review")
    }

    async fn average(service: &CatalogService) -> String {
        service.product(ProductId(1)).await.unwrap().average_rating.to_string()
    }

    #[tokio::test]
    async fn test_add_comment_updates_average() {
        let (_repo, service, _) = setup(Decimal::TEN).await;

        service.add_comment(review(1)).await.unwrap();
        service.add_comment(review(5)).await.unwrap();
        assert_eq!(average(&service).await, "3.00");

        service.add_comment(review(5)).await.unwrap();
        assert_eq!(average(&service).await, "3.67");
    }

    #[tokio::test]
    async fn test_removing_last_comment_resets_average() {
        let (_repo, service, _) = setup(Decimal::TEN).await;

        let first = service.add_comment(review(4)).await.unwrap();
        let second = service.add_comment(review(2)).await.unwrap();
        assert_eq!(average(&service).await, "3.00");

        service.remove_comment(first.id).await.unwrap();
        assert_eq!(average(&service).await, "2.00");

        service.remove_comment(second.id).await.unwrap();
        assert_eq!(average(&service).await, "0.00");
    }

    #[tokio::test]
    async fn test_comment_on_missing_product() {
        let (_repo, service, _) = setup(Decimal::TEN).await;
        let mut comment = review(3);
        comment.product_id = ProductId(42);

        let err = service.add_comment(comment).await.unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(ProductId(42))));
    }

    #[tokio::test]
    async fn test_remove_missing_comment() {
        let (_repo, service, _) = setup(Decimal::TEN).await;
        let err = service.remove_comment(CommentId(99)).await.unwrap_err();
        assert!(matches!(err, CoreError::CommentNotFound(CommentId(99))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_comments_are_all_counted() {
        let (_repo, service, _) = setup(Decimal::TEN).await;

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move { service.add_comment(review(if i % 2 == 0 { 5 } else { 2 })).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(average(&service).await, "3.50");
    }

    #[tokio::test]
    async fn test_discounted_price() {
        let (repo, service, now) = setup(Decimal::new(10000, 2)).await;
        assert_eq!(service.discounted_price(ProductId(1)).await.unwrap(), None);

        let end = now + Duration::days(3);
        repo.add_discount(
            Discount::new(DiscountId(1), ProductId(1), DiscountType::Percentage, Decimal::TEN, now, end).unwrap(),
        )
        .await;
        repo.add_discount(
            Discount::new(DiscountId(2), ProductId(1), DiscountType::Fixed, Decimal::new(500, 2), now, end).unwrap(),
        )
        .await;

        let quote = service.price_quote(ProductId(1)).await.unwrap();
        assert_eq!(quote.effective_price.map(|p| p.to_string()), Some("85.00".to_string()));
        assert_eq!(quote.applied, vec![DiscountId(1), DiscountId(2)]);
    }

    #[tokio::test]
    async fn test_unusable_discount_record_keeps_base_price() {
        let (repo, service, now) = setup(Decimal::new(10000, 2)).await;
        repo.add_ignored_discount(IgnoredDiscount {
            id: DiscountId(1),
            product_id: ProductId(1),
            start_date: now,
            end_date: now + Duration::days(1),
        })
        .await;

        let quote = service.price_quote(ProductId(1)).await.unwrap();
        assert_eq!(quote.effective_price.map(|p| p.to_string()), Some("100.00".to_string()));
        assert!(quote.applied.is_empty());
    }

    #[tokio::test]
    async fn test_active_only_uses_injected_clock() {
        let now = Utc::now();
        let repo = Arc::new(InMemoryCatalogRepository::new());
        repo.add_product(Product::new(ProductId(1), "Kettle", "kettle", Decimal::ONE_HUNDRED, now).unwrap()).await;
        repo.add_discount(
            Discount::new(
                DiscountId(1),
                ProductId(1),
                DiscountType::Percentage,
                Decimal::from(20),
                now,
                now + Duration::days(1),
            )
            .unwrap(),
        )
        .await;
        let pricing = PricingEngine::new(PricingConfig { window_policy: DiscountWindowPolicy::ActiveOnly });

        let during = CatalogService::new(repo.clone(), Arc::new(FixedClock(now)), pricing);
        assert_eq!(during.discounted_price(ProductId(1)).await.unwrap(), Some(Decimal::from(80)));

        let pricing = PricingEngine::new(PricingConfig { window_policy: DiscountWindowPolicy::ActiveOnly });
        let after = CatalogService::new(repo, Arc::new(FixedClock(now + Duration::days(2))), pricing);
        assert_eq!(after.discounted_price(ProductId(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reconcile_corrects_stale_average() {
        let (repo, service, _) = setup(Decimal::TEN).await;
        service.add_comment(review(4)).await.unwrap();

        // Simulate a writer that bypassed the service.
        repo.save_product_average(ProductId(1), Decimal::ONE).await.unwrap();

        let report = service.reconcile_ratings().await.unwrap();
        assert_eq!(report, ReconcileReport { products: 1, corrected: 1, failed: 0 });
        assert_eq!(average(&service).await, "4.00");

        let report = service.reconcile_ratings().await.unwrap();
        assert_eq!(report.corrected, 0);
    }

    #[tokio::test]
    async fn test_reconcile_counts_only_visited_products() {
        let now = Utc::now();
        let inner = InMemoryCatalogRepository::new();
        inner.add_product(Product::new(ProductId(1), "Kettle", "kettle", Decimal::TEN, now).unwrap()).await;
        let mut repo = Forwarding::new(inner);
        repo.phantom_ids.push(ProductId(77));
        let service = CatalogService::new(Arc::new(repo), Arc::new(FixedClock(now)), PricingEngine::default());

        let report = service.reconcile_ratings().await.unwrap();
        assert_eq!(report, ReconcileReport { products: 1, corrected: 0, failed: 0 });
    }

    #[tokio::test]
    async fn test_active_products() {
        let (repo, service, now) = setup(Decimal::TEN).await;
        let mut hidden = Product::new(ProductId(2), "Old", "old", Decimal::ONE, now).unwrap();
        hidden.is_active = false;
        repo.add_product(hidden).await;

        let products = service.active_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, ProductId(1));
    }
}
