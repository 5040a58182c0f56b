use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewChanges {
    pub rating: Option<i32>,
    pub comment: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingSummary {
    pub count: i64,
    /// `None` when the product has no reviews yet.
    pub average: Option<f64>,
}

impl RatingSummary {
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self {
                count: 0,
                average: None,
            };
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        let average = sum as f64 / ratings.len() as f64;
        Self {
            count: ratings.len() as i64,
            average: Some((average * 100.0).round() / 100.0),
        }
    }
}

pub fn validate_rating(rating: i32) -> Result<(), DomainError> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(DomainError::invalid(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}
