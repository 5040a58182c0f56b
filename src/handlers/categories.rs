use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::CatalogService;
use crate::auth::AuthUser;
use crate::domain::catalog::{Category, CategoryInput};
use crate::errors::AppError;

use super::timestamp;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

impl From<CategoryRequest> for CategoryInput {
    fn from(r: CategoryRequest) -> Self {
        CategoryInput {
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        CategoryResponse {
            id: c.id,
            name: c.name,
            description: c.description,
            created_at: timestamp(&c.created_at),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categorias")
            .route("", web::get().to(list_categories))
            .route("", web::post().to(create_category))
            .route("/{id}", web::get().to(get_category))
            .route("/{id}", web::put().to(update_category))
            .route("/{id}", web::delete().to(delete_category)),
    );
}

/// GET /api/categorias
#[utoipa::path(
    get,
    path = "/api/categorias",
    responses((status = 200, description = "Categories ordered by name", body = Vec<CategoryResponse>)),
    tag = "categorias"
)]
pub async fn list_categories(
    service: web::Data<CatalogService>,
) -> Result<HttpResponse, AppError> {
    let categories = web::block(move || service.list_categories()).await??;
    Ok(HttpResponse::Ok().json(
        categories
            .into_iter()
            .map(CategoryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/categorias/{id}
#[utoipa::path(
    get,
    path = "/api/categorias/{id}",
    params(("id" = Uuid, Path, description = "Category UUID")),
    responses(
        (status = 200, description = "Category found", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    tag = "categorias"
)]
pub async fn get_category(
    service: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let category = web::block(move || service.get_category(id)).await??;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

/// POST /api/categorias
#[utoipa::path(
    post,
    path = "/api/categorias",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "categorias"
)]
pub async fn create_category(
    service: web::Data<CatalogService>,
    auth: AuthUser,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let input = CategoryInput::from(body.into_inner());
    let category = web::block(move || service.create_category(input)).await??;
    Ok(HttpResponse::Created().json(CategoryResponse::from(category)))
}

/// PUT /api/categorias/{id}
#[utoipa::path(
    put,
    path = "/api/categorias/{id}",
    params(("id" = Uuid, Path, description = "Category UUID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "categorias"
)]
pub async fn update_category(
    service: web::Data<CatalogService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    let input = CategoryInput::from(body.into_inner());
    let category = web::block(move || service.update_category(id, input)).await??;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

/// DELETE /api/categorias/{id}
#[utoipa::path(
    delete,
    path = "/api/categorias/{id}",
    params(("id" = Uuid, Path, description = "Category UUID")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category has associated products"),
    ),
    security(("bearer_auth" = [])),
    tag = "categorias"
)]
pub async fn delete_category(
    service: web::Data<CatalogService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    web::block(move || service.delete_category(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
