use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::optional_text;
use crate::domain::ports::{ProductRepository, ReviewRepository};
use crate::domain::review::{
    validate_rating, NewReview, RatingSummary, Review, ReviewChanges,
};

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    products: Arc<dyn ProductRepository>,
}

impl ReviewService {
    pub fn new(reviews: Arc<dyn ReviewRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { reviews, products }
    }

    pub fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError> {
        self.ensure_product(product_id)?;
        self.reviews.list_for_product(product_id)
    }

    pub fn summary(&self, product_id: Uuid) -> Result<RatingSummary, DomainError> {
        self.ensure_product(product_id)?;
        let ratings = self.reviews.ratings_for_product(product_id)?;
        Ok(RatingSummary::from_ratings(&ratings))
    }

    pub fn create(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        rating: i32,
        comment: Option<String>,
    ) -> Result<Review, DomainError> {
        self.ensure_product(product_id)?;
        validate_rating(rating)?;
        self.reviews.create(NewReview {
            product_id,
            user_id,
            rating,
            comment: optional_text("comment", comment, 2000)?,
        })
    }

    pub fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        rating: Option<i32>,
        comment: Option<String>,
    ) -> Result<Review, DomainError> {
        let review = self.load(id)?;
        if review.user_id != user_id {
            return Err(DomainError::Forbidden(
                "only the author can edit a review".into(),
            ));
        }
        if let Some(rating) = rating {
            validate_rating(rating)?;
        }
        let changes = ReviewChanges {
            rating,
            comment: match comment {
                Some(c) => Some(optional_text("comment", Some(c), 2000)?),
                None => None,
            },
        };
        self.reviews
            .update(id, changes)?
            .ok_or(DomainError::NotFound("Review"))
    }

    pub fn delete(&self, user_id: Uuid, is_admin: bool, id: Uuid) -> Result<(), DomainError> {
        let review = self.load(id)?;
        if review.user_id != user_id && !is_admin {
            return Err(DomainError::Forbidden(
                "only the author or an admin can delete a review".into(),
            ));
        }
        if self.reviews.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("Review"))
        }
    }

    fn load(&self, id: Uuid) -> Result<Review, DomainError> {
        self.reviews
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Review"))
    }

    fn ensure_product(&self, product_id: Uuid) -> Result<(), DomainError> {
        match self.products.find_by_id(product_id)? {
            Some(_) => Ok(()),
            None => Err(DomainError::NotFound("Product")),
        }
    }
}
