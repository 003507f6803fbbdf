use async_trait::async_trait;
use chrono::Utc;
use emporium_catalog::{
    average_rating, Comment, CommentId, Discount, DiscountRecords, IgnoredDiscount, NewComment, Product, ProductId,
    Rating,
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::repository::{CatalogRepository, RepositoryError, RepositoryResult};

#[derive(Default)]
struct CatalogState {
    products: BTreeMap<ProductId, Product>,
    comments: BTreeMap<CommentId, Comment>,
    discounts: Vec<Discount>,
    ignored_discounts: Vec<IgnoredDiscount>,
    next_comment_id: i64,
}

impl CatalogState {
    fn ratings_for(&self, product_id: ProductId) -> Vec<Rating> {
        self.comments
            .values()
            .filter(|c| c.product_id == product_id)
            .map(|c| c.rating)
            .collect()
    }
}

/// Process-local repository used by tests and embedders without a database.
#[derive(Default)]
pub struct InMemoryCatalogRepository {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: Product) {
        self.state.write().await.products.insert(product.id, product);
    }

    pub async fn add_discount(&self, discount: Discount) {
        self.state.write().await.discounts.push(discount);
    }

    /// Stores a record that counts as attached to its product but never applies.
    pub async fn add_ignored_discount(&self, discount: IgnoredDiscount) {
        self.state.write().await.ignored_discounts.push(discount);
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_product(&self, id: ProductId) -> RepositoryResult<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn list_active_products(&self) -> RepositoryResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state.products.values().filter(|p| p.is_active).cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn list_product_ids(&self) -> RepositoryResult<Vec<ProductId>> {
        Ok(self.state.read().await.products.keys().copied().collect())
    }

    async fn insert_comment(&self, comment: &NewComment) -> RepositoryResult<Comment> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&comment.product_id) {
            return Err(RepositoryError::ProductNotFound(comment.product_id));
        }

        state.next_comment_id += 1;
        let stored = comment.clone().into_comment(CommentId(state.next_comment_id), Utc::now());
        state.comments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn remove_comment(&self, id: CommentId) -> RepositoryResult<Option<Comment>> {
        Ok(self.state.write().await.comments.remove(&id))
    }

    async fn find_comments_by_product(&self, product_id: ProductId) -> RepositoryResult<Vec<Comment>> {
        let state = self.state.read().await;
        Ok(state.comments.values().filter(|c| c.product_id == product_id).cloned().collect())
    }

    async fn find_discounts_by_product(&self, product_id: ProductId) -> RepositoryResult<DiscountRecords> {
        let state = self.state.read().await;
        Ok(DiscountRecords {
            discounts: state.discounts.iter().filter(|d| d.product_id == product_id).cloned().collect(),
            ignored: state
                .ignored_discounts
                .iter()
                .filter(|d| d.product_id == product_id)
                .cloned()
                .collect(),
        })
    }

    async fn save_product_average(&self, product_id: ProductId, value: Decimal) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(RepositoryError::ProductNotFound(product_id))?;
        product.average_rating = value;
        product.updated_at = Utc::now();
        Ok(())
    }

    /// Aggregates and stores under one write guard so concurrent writers
    /// cannot interleave.
    async fn refresh_average_rating(&self, product_id: ProductId) -> RepositoryResult<Decimal> {
        let mut state = self.state.write().await;
        let average = average_rating(&state.ratings_for(product_id));
        let product = state
            .products
            .get_mut(&product_id)
            .ok_or(RepositoryError::ProductNotFound(product_id))?;
        product.average_rating = average;
        product.updated_at = Utc::now();
        Ok(average)
    }
}
