//! Postgres-backed catalog repository.
//!
//! Expects `products`, `comments` and `discounts` tables; the schema itself is
//! owned by the web application.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use emporium_catalog::{
    average_rating, CatalogError, Comment, CommentId, Discount, DiscountId, DiscountRecords, DiscountType,
    IgnoredDiscount, NewComment, Product, ProductId, Rating,
};
use emporium_core::repository::{CatalogRepository, RepositoryError, RepositoryResult};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

const PRODUCT_COLUMNS: &str =
    "id, title, slug, description, price, average_rating, in_stock, is_active, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, product_id, user_id, rating, text, is_published, created_at";

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    title: String,
    slug: String,
    description: String,
    price: Decimal,
    average_rating: Decimal,
    in_stock: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId(row.id),
            title: row.title,
            slug: row.slug,
            description: row.description,
            price: row.price,
            average_rating: row.average_rating,
            in_stock: row.in_stock,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    product_id: i64,
    user_id: Uuid,
    rating: i32,
    text: String,
    is_published: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommentRow> for Comment {
    type Error = CatalogError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: CommentId(row.id),
            product_id: ProductId(row.product_id),
            user_id: row.user_id,
            rating: Rating::try_from(row.rating)?,
            text: row.text,
            is_published: row.is_published,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: i64,
    product_id: i64,
    discount_type: String,
    value: Decimal,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

/// Rows that do not form a valid discount (unknown type, inverted window)
/// are kept as ignored records: they never change the price but still mark
/// the product as having discounts configured.
fn discounts_from_rows(rows: Vec<DiscountRow>) -> DiscountRecords {
    let mut records = DiscountRecords::default();

    for row in rows {
        let discount = row.discount_type.parse::<DiscountType>().and_then(|discount_type| {
            Discount::new(
                DiscountId(row.id),
                ProductId(row.product_id),
                discount_type,
                row.value,
                row.start_date,
                row.end_date,
            )
        });
        match discount {
            Ok(discount) => records.discounts.push(discount),
            Err(e) => {
                warn!("Ignoring discount {} on product {}: {}", row.id, row.product_id, e);
                records.ignored.push(IgnoredDiscount {
                    id: DiscountId(row.id),
                    product_id: ProductId(row.product_id),
                    start_date: row.start_date,
                    end_date: row.end_date,
                });
            }
        }
    }

    records
}

fn comments_from_rows(rows: Vec<CommentRow>) -> RepositoryResult<Vec<Comment>> {
    rows.into_iter()
        .map(|row| Comment::try_from(row).map_err(RepositoryError::from))
        .collect()
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn find_product(&self, id: ProductId) -> RepositoryResult<Option<Product>> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::backend)?;

        Ok(row.map(Product::from))
    }

    async fn list_active_products(&self) -> RepositoryResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {} FROM products WHERE is_active ORDER BY created_at DESC",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_product_ids(&self) -> RepositoryResult<Vec<ProductId>> {
        let ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        Ok(ids.into_iter().map(|(id,)| ProductId(id)).collect())
    }

    async fn insert_comment(&self, comment: &NewComment) -> RepositoryResult<Comment> {
        let row: CommentRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO comments (product_id, user_id, rating, text, is_published, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING {}
            "#,
            COMMENT_COLUMNS
        ))
        .bind(comment.product_id.0)
        .bind(comment.user_id)
        .bind(i32::from(comment.rating.value()))
        .bind(&comment.text)
        .bind(comment.is_published)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(Comment::try_from(row)?)
    }

    async fn remove_comment(&self, id: CommentId) -> RepositoryResult<Option<Comment>> {
        let row: Option<CommentRow> =
            sqlx::query_as(&format!("DELETE FROM comments WHERE id = $1 RETURNING {}", COMMENT_COLUMNS))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(RepositoryError::backend)?;

        Ok(row.map(Comment::try_from).transpose()?)
    }

    async fn find_comments_by_product(&self, product_id: ProductId) -> RepositoryResult<Vec<Comment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(&format!(
            "SELECT {} FROM comments WHERE product_id = $1 ORDER BY id",
            COMMENT_COLUMNS
        ))
        .bind(product_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        comments_from_rows(rows)
    }

    async fn find_discounts_by_product(&self, product_id: ProductId) -> RepositoryResult<DiscountRecords> {
        let rows: Vec<DiscountRow> = sqlx::query_as(
            "SELECT id, product_id, discount_type, value, start_date, end_date FROM discounts WHERE product_id = $1 ORDER BY id",
        )
        .bind(product_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::backend)?;

        Ok(discounts_from_rows(rows))
    }

    async fn save_product_average(&self, product_id: ProductId, value: Decimal) -> RepositoryResult<()> {
        let result = sqlx::query("UPDATE products SET average_rating = $1, updated_at = NOW() WHERE id = $2")
            .bind(value)
            .bind(product_id.0)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::backend)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::ProductNotFound(product_id));
        }
        Ok(())
    }

    /// Holds the product row lock for the whole read-aggregate-write, so two
    /// concurrent comment writes cannot leave an average missing either row.
    async fn refresh_average_rating(&self, product_id: ProductId) -> RepositoryResult<Decimal> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::backend)?;

        let locked: Option<(i64,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::backend)?;
        if locked.is_none() {
            return Err(RepositoryError::ProductNotFound(product_id));
        }

        let rows: Vec<(i32,)> = sqlx::query_as("SELECT rating FROM comments WHERE product_id = $1")
            .bind(product_id.0)
            .fetch_all(&mut *tx)
            .await
            .map_err(RepositoryError::backend)?;
        let ratings = rows
            .into_iter()
            .map(|(rating,)| Rating::try_from(rating))
            .collect::<Result<Vec<_>, _>>()?;
        let average = average_rating(&ratings);

        sqlx::query("UPDATE products SET average_rating = $1, updated_at = NOW() WHERE id = $2")
            .bind(average)
            .bind(product_id.0)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::backend)?;

        tx.commit().await.map_err(RepositoryError::backend)?;
        debug!("Stored average {} over {} rating(s) for product {}", average, ratings.len(), product_id);
        Ok(average)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use emporium_catalog::PricingEngine;

    fn discount_row(id: i64, discount_type: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> DiscountRow {
        DiscountRow {
            id,
            product_id: 1,
            discount_type: discount_type.to_string(),
            value: Decimal::TEN,
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_invalid_discount_rows_kept_as_ignored() {
        let now = Utc::now();
        let later = now + Duration::days(1);
        let rows = vec![
            discount_row(1, "percentage", now, later),
            discount_row(2, "buy_one_get_one", now, later),
            discount_row(3, "fixed", later, now),
            discount_row(4, "fixed", now, later),
        ];

        let records = discounts_from_rows(rows);
        let ids: Vec<DiscountId> = records.discounts.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![DiscountId(1), DiscountId(4)]);
        assert_eq!(records.discounts[1].discount_type, DiscountType::Fixed);

        let ignored: Vec<DiscountId> = records.ignored.iter().map(|d| d.id).collect();
        assert_eq!(ignored, vec![DiscountId(2), DiscountId(3)]);
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn test_unknown_type_only_row_prices_at_base() {
        let now = Utc::now();
        let records = discounts_from_rows(vec![discount_row(1, "bogo", now, now + Duration::days(1))]);
        let product = Product::new(ProductId(1), "Desk", "desk", Decimal::new(10000, 2), now).unwrap();

        let quote = PricingEngine::default().quote_records(&product, &records, now);
        assert_eq!(quote.effective_price, Some(Decimal::new(10000, 2)));
        assert_eq!(quote.effective_price.map(|p| p.to_string()), Some("100.00".to_string()));
    }

    #[test]
    fn test_out_of_range_rating_row_is_error() {
        let row = CommentRow {
            id: 1,
            product_id: 1,
            user_id: Uuid::new_v4(),
            rating: 7,
            text: String::new(),
            is_published: true,
            created_at: Utc::now(),
        };

        let err = comments_from_rows(vec![row]).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRow(CatalogError::RatingOutOfRange(7))));
    }
}
