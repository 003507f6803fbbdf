use async_trait::async_trait;
use emporium_catalog::{
    average_rating, CatalogError, Comment, CommentId, DiscountRecords, NewComment, Product, ProductId, Rating,
};
use rust_decimal::Decimal;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),
    #[error("Stored row failed validation: {0}")]
    InvalidRow(#[from] CatalogError),
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Backend(err.into())
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence collaborator for the catalog records the derived fields are
/// computed from.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_product(&self, id: ProductId) -> RepositoryResult<Option<Product>>;

    /// Products with `is_active` set, newest first.
    async fn list_active_products(&self) -> RepositoryResult<Vec<Product>>;

    async fn list_product_ids(&self) -> RepositoryResult<Vec<ProductId>>;

    async fn insert_comment(&self, comment: &NewComment) -> RepositoryResult<Comment>;

    /// Deletes the row and returns it, or `None` if it did not exist.
    async fn remove_comment(&self, id: CommentId) -> RepositoryResult<Option<Comment>>;

    async fn find_comments_by_product(&self, product_id: ProductId) -> RepositoryResult<Vec<Comment>>;

    /// All discount records for the product, including rows that load but
    /// cannot be applied.
    async fn find_discounts_by_product(&self, product_id: ProductId) -> RepositoryResult<DiscountRecords>;

    async fn save_product_average(&self, product_id: ProductId, value: Decimal) -> RepositoryResult<()>;

    /// Recomputes and stores the product's average rating.
    ///
    /// The default runs read, aggregate and write as separate calls, which is
    /// only correct with a single writer per product. Backends that can scope
    /// the sequence to one transaction or lock should override it.
    async fn refresh_average_rating(&self, product_id: ProductId) -> RepositoryResult<Decimal> {
        let ratings: Vec<Rating> = self
            .find_comments_by_product(product_id)
            .await?
            .into_iter()
            .map(|c| c.rating)
            .collect();
        let average = average_rating(&ratings);
        self.save_product_average(product_id, average).await?;
        Ok(average)
    }
}
