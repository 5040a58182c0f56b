use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::ReviewService;
use crate::auth::AuthUser;
use crate::domain::review::{RatingSummary, Review};
use crate::errors::AppError;

use super::timestamp;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    /// 1 to 5.
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    /// An empty string removes the comment.
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        ReviewResponse {
            id: r.id,
            product_id: r.product_id,
            user_id: r.user_id,
            rating: r.rating,
            comment: r.comment,
            created_at: timestamp(&r.created_at),
            updated_at: timestamp(&r.updated_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RatingSummaryResponse {
    pub count: i64,
    /// Rounded to two decimals; null without reviews.
    pub average: Option<f64>,
}

impl From<RatingSummary> for RatingSummaryResponse {
    fn from(s: RatingSummary) -> Self {
        RatingSummaryResponse {
            count: s.count,
            average: s.average,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/productos/{id}/resenas")
            .route(web::get().to(list_reviews))
            .route(web::post().to(create_review)),
    )
    .route("/productos/{id}/resenas/resumen", web::get().to(rating_summary))
    .service(
        web::resource("/resenas/{id}")
            .route(web::put().to(update_review))
            .route(web::delete().to(delete_review)),
    );
}

/// GET /api/productos/{id}/resenas
#[utoipa::path(
    get,
    path = "/api/productos/{id}/resenas",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Reviews, newest first", body = Vec<ReviewResponse>),
        (status = 404, description = "Product not found"),
    ),
    tag = "resenas"
)]
pub async fn list_reviews(
    service: web::Data<ReviewService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let reviews = web::block(move || service.list_for_product(product_id)).await??;
    Ok(HttpResponse::Ok().json(
        reviews
            .into_iter()
            .map(ReviewResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/productos/{id}/resenas/resumen
#[utoipa::path(
    get,
    path = "/api/productos/{id}/resenas/resumen",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Review count and average rating", body = RatingSummaryResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "resenas"
)]
pub async fn rating_summary(
    service: web::Data<ReviewService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let summary = web::block(move || service.summary(product_id)).await??;
    Ok(HttpResponse::Ok().json(RatingSummaryResponse::from(summary)))
}

/// POST /api/productos/{id}/resenas
#[utoipa::path(
    post,
    path = "/api/productos/{id}/resenas",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 400, description = "Rating out of range"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product already reviewed by this user"),
    ),
    security(("bearer_auth" = [])),
    tag = "resenas"
)]
pub async fn create_review(
    service: web::Data<ReviewService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let body = body.into_inner();

    let review = web::block(move || {
        service.create(auth.id, product_id, body.rating, body.comment)
    })
    .await??;

    Ok(HttpResponse::Created().json(ReviewResponse::from(review)))
}

/// PUT /api/resenas/{id}
#[utoipa::path(
    put,
    path = "/api/resenas/{id}",
    params(("id" = Uuid, Path, description = "Review UUID")),
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ReviewResponse),
        (status = 400, description = "Rating out of range"),
        (status = 403, description = "Only the author may edit"),
        (status = 404, description = "Review not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "resenas"
)]
pub async fn update_review(
    service: web::Data<ReviewService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let body = body.into_inner();

    let review =
        web::block(move || service.update(auth.id, id, body.rating, body.comment)).await??;

    Ok(HttpResponse::Ok().json(ReviewResponse::from(review)))
}

/// DELETE /api/resenas/{id}
#[utoipa::path(
    delete,
    path = "/api/resenas/{id}",
    params(("id" = Uuid, Path, description = "Review UUID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 403, description = "Only the author or an admin may delete"),
        (status = 404, description = "Review not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "resenas"
)]
pub async fn delete_review(
    service: web::Data<ReviewService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let is_admin = auth.is_admin();
    web::block(move || service.delete(auth.id, is_admin, id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
