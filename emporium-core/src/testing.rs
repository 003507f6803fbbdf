use async_trait::async_trait;
use emporium_catalog::{Comment, CommentId, DiscountRecords, NewComment, Product, ProductId};
use rust_decimal::Decimal;

use crate::memory::InMemoryCatalogRepository;
use crate::repository::{CatalogRepository, RepositoryResult};

/// Delegates to an in-memory repository but keeps the trait's default
/// `refresh_average_rating`. `phantom_ids` are listed but never stored, as
/// if deleted right after the listing.
pub(crate) struct Forwarding {
    pub inner: InMemoryCatalogRepository,
    pub phantom_ids: Vec<ProductId>,
}

impl Forwarding {
    pub fn new(inner: InMemoryCatalogRepository) -> Self {
        Self {
            inner,
            phantom_ids: Vec::new(),
        }
    }
}

#[async_trait]
impl CatalogRepository for Forwarding {
    async fn find_product(&self, id: ProductId) -> RepositoryResult<Option<Product>> {
        self.inner.find_product(id).await
    }
    async fn list_active_products(&self) -> RepositoryResult<Vec<Product>> {
        self.inner.list_active_products().await
    }
    async fn list_product_ids(&self) -> RepositoryResult<Vec<ProductId>> {
        let mut ids = self.inner.list_product_ids().await?;
        ids.extend(self.phantom_ids.iter().copied());
        Ok(ids)
    }
    async fn insert_comment(&self, comment: &NewComment) -> RepositoryResult<Comment> {
        self.inner.insert_comment(comment).await
    }
    async fn remove_comment(&self, id: CommentId) -> RepositoryResult<Option<Comment>> {
        self.inner.remove_comment(id).await
    }
    async fn find_comments_by_product(&self, product_id: ProductId) -> RepositoryResult<Vec<Comment>> {
        self.inner.find_comments_by_product(product_id).await
    }
    async fn find_discounts_by_product(&self, product_id: ProductId) -> RepositoryResult<DiscountRecords> {
        self.inner.find_discounts_by_product(product_id).await
    }
    async fn save_product_average(&self, product_id: ProductId, value: Decimal) -> RepositoryResult<()> {
        self.inner.save_product_average(product_id, value).await
    }
}
