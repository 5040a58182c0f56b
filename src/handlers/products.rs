use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::catalog_service::{ProductInput, ProductPatch};
use crate::application::CatalogService;
use crate::auth::AuthUser;
use crate::domain::catalog::{Product, ProductFilter};
use crate::domain::PageRequest;
use crate::errors::AppError;

use super::{default_limit, default_page, money, timestamp, PageResponse};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    /// Case-insensitive search on the product name.
    pub q: Option<String>,
    /// Staff only; ignored for everybody else.
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub category_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    /// Decimal amount as a string, e.g. "2.50".
    pub price: String,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub category_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: String,
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        ProductResponse {
            id: p.id,
            category_id: p.category_id,
            vendor_id: p.vendor_id,
            name: p.name,
            description: p.description,
            price: money(&p.price),
            stock: p.stock,
            image_url: p.image_url,
            is_active: p.is_active,
            created_at: timestamp(&p.created_at),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/productos")
            .route(web::get().to(list_products))
            .route(web::post().to(create_product)),
    )
    .service(
        web::resource("/productos/{id}")
            .route(web::get().to(get_product))
            .route(web::put().to(update_product))
            .route(web::delete().to(delete_product)),
    );
}

/// GET /api/productos
#[utoipa::path(
    get,
    path = "/api/productos",
    params(ProductQuery),
    responses((status = 200, description = "Paginated product list", body = PageResponse<ProductResponse>)),
    tag = "productos"
)]
pub async fn list_products(
    service: web::Data<CatalogService>,
    auth: Option<AuthUser>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let is_staff = auth.is_some_and(|a| a.is_staff());
    let filter = ProductFilter {
        category_id: query.category_id,
        vendor_id: query.vendor_id,
        search: query.q,
        include_inactive: query.include_inactive && is_staff,
    };
    let page = PageRequest::new(query.page, query.limit);

    let products = web::block(move || service.list_products(filter, page)).await??;

    Ok(HttpResponse::Ok().json(PageResponse::from_page(products, ProductResponse::from)))
}

/// GET /api/productos/{id}
#[utoipa::path(
    get,
    path = "/api/productos/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "productos"
)]
pub async fn get_product(
    service: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = web::block(move || service.get_product(id)).await??;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// POST /api/productos
#[utoipa::path(
    post,
    path = "/api/productos",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid price, stock or category"),
        (status = 403, description = "Staff only"),
    ),
    security(("bearer_auth" = [])),
    tag = "productos"
)]
pub async fn create_product(
    service: web::Data<CatalogService>,
    auth: AuthUser,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let body = body.into_inner();

    let product = web::block(move || {
        service.create_product(ProductInput {
            category_id: body.category_id,
            vendor_id: body.vendor_id,
            name: body.name,
            description: body.description,
            price: body.price,
            stock: body.stock,
            image_url: body.image_url,
        })
    })
    .await??;

    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// PUT /api/productos/{id}
#[utoipa::path(
    put,
    path = "/api/productos/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "productos"
)]
pub async fn update_product(
    service: web::Data<CatalogService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let body = body.into_inner();

    let product = web::block(move || {
        service.update_product(
            id,
            ProductPatch {
                category_id: body.category_id,
                vendor_id: body.vendor_id,
                name: body.name,
                description: body.description,
                price: body.price,
                stock: body.stock,
                image_url: body.image_url,
                is_active: body.is_active,
            },
        )
    })
    .await??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// DELETE /api/productos/{id}
#[utoipa::path(
    delete,
    path = "/api/productos/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Product appears on orders"),
    ),
    security(("bearer_auth" = [])),
    tag = "productos"
)]
pub async fn delete_product(
    service: web::Data<CatalogService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    web::block(move || service.delete_product(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
