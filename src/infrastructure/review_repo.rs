use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ReviewRepository;
use crate::domain::review::{NewReview, Review, ReviewChanges};
use crate::schema::reviews;

use super::models::{NewReviewRow, ReviewChangeset, ReviewRow};

pub struct DieselReviewRepository {
    pool: DbPool,
}

impl DieselReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ReviewRepository for DieselReviewRepository {
    fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(reviews::table
            .filter(reviews::product_id.eq(product_id))
            .select(ReviewRow::as_select())
            .order(reviews::created_at.desc())
            .load(&mut conn)?
            .into_iter()
            .map(Review::from)
            .collect())
    }

    fn ratings_for_product(&self, product_id: Uuid) -> Result<Vec<i32>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(reviews::table
            .filter(reviews::product_id.eq(product_id))
            .select(reviews::rating)
            .load(&mut conn)?)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(reviews::table
            .find(id)
            .select(ReviewRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Review::from))
    }

    fn create(&self, review: NewReview) -> Result<Review, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::insert_into(reviews::table)
            .values(&NewReviewRow {
                id: Uuid::new_v4(),
                product_id: review.product_id,
                user_id: review.user_id,
                rating: review.rating,
                comment: review.comment,
            })
            .returning(ReviewRow::as_returning())
            .get_result(&mut conn)?
            .into())
    }

    fn update(&self, id: Uuid, changes: ReviewChanges) -> Result<Option<Review>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(diesel::update(reviews::table.find(id))
            .set(&ReviewChangeset {
                rating: changes.rating,
                comment: changes.comment,
                updated_at: Utc::now(),
            })
            .returning(ReviewRow::as_returning())
            .get_result(&mut conn)
            .optional()?
            .map(Review::from))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(reviews::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::DieselReviewRepository;
    use crate::domain::account::Role;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::ReviewRepository;
    use crate::domain::review::{NewReview, RatingSummary, ReviewChanges};
    use crate::infrastructure::test_support::{insert_product, insert_user, setup_db};

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn one_review_per_user_and_product() {
        let (_container, pool) = setup_db().await;
        let user = insert_user(&pool, "critic@cafe.test", Role::Customer);
        let product = insert_product(&pool, "Brownie", "2.80");
        let repo = DieselReviewRepository::new(pool);
        let review = || NewReview {
            product_id: product.id,
            user_id: user.id,
            rating: 4,
            comment: Some("Muy rico".into()),
        };

        repo.create(review()).expect("create failed");
        assert!(matches!(repo.create(review()), Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn ratings_feed_the_summary() {
        let (_container, pool) = setup_db().await;
        let product = insert_product(&pool, "Brownie", "2.80");
        let repo = DieselReviewRepository::new(pool.clone());
        for (i, rating) in [5, 4, 4].into_iter().enumerate() {
            let user = insert_user(&pool, &format!("r{i}@cafe.test"), Role::Customer);
            repo.create(NewReview {
                product_id: product.id,
                user_id: user.id,
                rating,
                comment: None,
            })
            .expect("create failed");
        }

        let ratings = repo.ratings_for_product(product.id).unwrap();
        let summary = RatingSummary::from_ratings(&ratings);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Some(4.33));
        assert_eq!(repo.list_for_product(product.id).unwrap().len(), 3);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn update_clears_comment() {
        let (_container, pool) = setup_db().await;
        let user = insert_user(&pool, "edit@cafe.test", Role::Customer);
        let product = insert_product(&pool, "Brownie", "2.80");
        let repo = DieselReviewRepository::new(pool);
        let review = repo
            .create(NewReview {
                product_id: product.id,
                user_id: user.id,
                rating: 2,
                comment: Some("Seco".into()),
            })
            .unwrap();

        let updated = repo
            .update(
                review.id,
                ReviewChanges {
                    rating: Some(3),
                    comment: Some(None),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.rating, 3);
        assert_eq!(updated.comment, None);
        assert!(updated.updated_at >= review.updated_at);
    }
}
