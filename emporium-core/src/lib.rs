pub mod clock;
pub mod repository;
pub mod memory;
pub mod service;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use memory::InMemoryCatalogRepository;
pub use repository::{CatalogRepository, RepositoryError, RepositoryResult};
pub use service::{CatalogService, ReconcileReport};

use emporium_catalog::{CatalogError, CommentId, ProductId};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(#[from] CatalogError),
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),
    #[error("Comment not found: {0}")]
    CommentNotFound(CommentId),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub type CoreResult<T> = Result<T, CoreError>;
