use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::product::ProductId;
use crate::{CatalogError, CatalogResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub i64);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Star rating attached to a comment. Always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> CatalogResult<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(CatalogError::RatingOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<i64> for Rating {
    type Error = CatalogError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for Rating {
    type Error = CatalogError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value as i64)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

/// A persisted review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub product_id: ProductId,
    pub user_id: Uuid,
    pub rating: Rating,
    pub text: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Comment by {} on product {}", self.user_id, self.product_id)
    }
}

/// A review that has passed validation but has not been stored yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub product_id: ProductId,
    pub user_id: Uuid,
    pub rating: Rating,
    pub text: String,
    /// Comments are held for moderation unless stated otherwise.
    #[serde(default)]
    pub is_published: bool,
}

impl NewComment {
    pub fn new(product_id: ProductId, user_id: Uuid, rating: Rating, text: impl Into<String>) -> Self {
        Self {
            product_id,
            user_id,
            rating,
            text: text.into(),
            is_published: false,
        }
    }

    pub fn into_comment(self, id: CommentId, created_at: DateTime<Utc>) -> Comment {
        Comment {
            id,
            product_id: self.product_id,
            user_id: self.user_id,
            rating: self.rating,
            text: self.text,
            is_published: self.is_published,
            created_at,
        }
    }
}
