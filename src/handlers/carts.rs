use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::CartService;
use crate::auth::AuthUser;
use crate::domain::cart::{Cart, CartItem};
use crate::errors::AppError;

use super::money;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    /// Added to the quantity already in the cart for this product.
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    /// New quantity of the line; 0 removes it.
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: String,
    pub subtotal: String,
}

impl From<CartItem> for CartItemResponse {
    fn from(i: CartItem) -> Self {
        CartItemResponse {
            id: i.id,
            product_id: i.product_id,
            product_name: i.product_name,
            quantity: i.quantity,
            unit_price: money(&i.unit_price),
            subtotal: money(&i.subtotal),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total: String,
    pub items: Vec<CartItemResponse>,
}

impl From<Cart> for CartResponse {
    fn from(c: Cart) -> Self {
        CartResponse {
            id: c.id,
            user_id: c.user_id,
            total: money(&c.total),
            items: c.items.into_iter().map(CartItemResponse::from).collect(),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/carrito")
            .route("", web::get().to(get_cart))
            .route("", web::delete().to(clear_cart))
            .route("/items", web::post().to(add_item))
            .route("/items/{item_id}", web::put().to(update_item))
            .route("/items/{item_id}", web::delete().to(remove_item)),
    );
}

/// GET /api/carrito
///
/// Returns the caller's cart, creating an empty one on first use.
#[utoipa::path(
    get,
    path = "/api/carrito",
    responses(
        (status = 200, description = "Current cart", body = CartResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "carrito"
)]
pub async fn get_cart(
    service: web::Data<CartService>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let cart = web::block(move || service.get(auth.id)).await??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /api/carrito/items
#[utoipa::path(
    post,
    path = "/api/carrito/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Cart after adding the item", body = CartResponse),
        (status = 400, description = "Invalid quantity or inactive product"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "carrito"
)]
pub async fn add_item(
    service: web::Data<CartService>,
    auth: AuthUser,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let cart =
        web::block(move || service.add_item(auth.id, body.product_id, body.quantity)).await??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /api/carrito/items/{item_id}
#[utoipa::path(
    put,
    path = "/api/carrito/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart item UUID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Cart after the change", body = CartResponse),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "carrito"
)]
pub async fn update_item(
    service: web::Data<CartService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let quantity = body.quantity;
    let cart = web::block(move || service.update_item(auth.id, item_id, quantity)).await??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /api/carrito/items/{item_id}
#[utoipa::path(
    delete,
    path = "/api/carrito/items/{item_id}",
    params(("item_id" = Uuid, Path, description = "Cart item UUID")),
    responses(
        (status = 200, description = "Cart after the removal", body = CartResponse),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "carrito"
)]
pub async fn remove_item(
    service: web::Data<CartService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let item_id = path.into_inner();
    let cart = web::block(move || service.remove_item(auth.id, item_id)).await??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /api/carrito
#[utoipa::path(
    delete,
    path = "/api/carrito",
    responses((status = 200, description = "Emptied cart", body = CartResponse)),
    security(("bearer_auth" = [])),
    tag = "carrito"
)]
pub async fn clear_cart(
    service: web::Data<CartService>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let cart = web::block(move || service.clear(auth.id)).await??;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
