use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::order_service::{Actor, CheckoutInput, PosLine, PosOrderInput};
use crate::application::OrderService;
use crate::auth::AuthUser;
use crate::domain::order::{
    Order, OrderFilter, OrderItem, OrderStatus, OrderStatusInfo, StatusChange,
};
use crate::domain::PageRequest;
use crate::errors::AppError;

use super::{default_limit, default_page, money, timestamp, PageResponse};

// ── Request / response DTOs ──────────────────────────────────────────────────

/// All fields are optional; send `{}` to check out with no extras.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Delivery address; must belong to the caller.
    pub address_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PosLineRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PosOrderRequest {
    /// Table served; it must be free or reserved and becomes occupied.
    pub table_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub items: Vec<PosLineRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatusRequest {
    /// Target status code, e.g. `PREPARING`.
    pub status: String,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddOrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderQuery {
    /// Staff only.
    pub status: Option<String>,
    /// Staff only.
    pub table_id: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: String,
    pub subtotal: String,
}

impl From<OrderItem> for OrderItemResponse {
    fn from(i: OrderItem) -> Self {
        OrderItemResponse {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price: money(&i.unit_price),
            subtotal: money(&i.subtotal),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub table_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub status: String,
    pub total: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            id: o.id,
            user_id: o.user_id,
            table_id: o.table_id,
            address_id: o.address_id,
            payment_method_id: o.payment_method_id,
            status: o.status.to_string(),
            total: money(&o.total),
            notes: o.notes,
            created_at: timestamp(&o.created_at),
            updated_at: timestamp(&o.updated_at),
            items: o.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusChangeResponse {
    pub id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: String,
}

impl From<StatusChange> for StatusChangeResponse {
    fn from(c: StatusChange) -> Self {
        StatusChangeResponse {
            id: c.id,
            from_status: c.from_status.map(|s| s.to_string()),
            to_status: c.to_status.to_string(),
            changed_by: c.changed_by,
            note: c.note,
            created_at: timestamp(&c.created_at),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStatusResponse {
    pub code: String,
    pub label: String,
    pub sort_order: i32,
}

impl From<OrderStatusInfo> for OrderStatusResponse {
    fn from(s: OrderStatusInfo) -> Self {
        OrderStatusResponse {
            code: s.code,
            label: s.label,
            sort_order: s.sort_order,
        }
    }
}

fn actor(auth: &AuthUser) -> Actor {
    Actor {
        user_id: auth.id,
        is_staff: auth.is_staff(),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pedidos")
            .route("", web::get().to(list_orders))
            .route("", web::post().to(create_pos_order))
            .route("/checkout", web::post().to(checkout))
            .route("/{id}", web::get().to(get_order))
            .route("/{id}/estado", web::patch().to(change_status))
            .route("/{id}/cancelar", web::post().to(cancel_order))
            .route("/{id}/historial", web::get().to(order_history))
            .route("/{id}/items", web::get().to(list_items))
            .route("/{id}/items", web::post().to(add_item))
            .route("/{id}/items/{item_id}", web::delete().to(remove_item)),
    )
    .route("/estados-pedido", web::get().to(list_statuses));
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/pedidos/checkout
///
/// Turns the caller's cart into a `PENDING` order. The order, its lines,
/// the first history entry and the emptied cart are written in one
/// database transaction.
#[utoipa::path(
    post,
    path = "/api/pedidos/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Malformed body, empty cart or invalid references"),
        (status = 404, description = "Address not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn checkout(
    service: web::Data<OrderService>,
    auth: AuthUser,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let order = web::block(move || {
        service.checkout(
            auth.id,
            CheckoutInput {
                address_id: body.address_id,
                payment_method_id: body.payment_method_id,
                notes: body.notes,
            },
        )
    })
    .await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// POST /api/pedidos
///
/// Point-of-sale order entered by staff, optionally seating a table.
#[utoipa::path(
    post,
    path = "/api/pedidos",
    request_body = PosOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "No items or invalid references"),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Table is not available"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn create_pos_order(
    service: web::Data<OrderService>,
    auth: AuthUser,
    body: web::Json<PosOrderRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let body = body.into_inner();

    let order = web::block(move || {
        service.create_pos_order(
            auth.id,
            PosOrderInput {
                table_id: body.table_id,
                payment_method_id: body.payment_method_id,
                notes: body.notes,
                items: body
                    .items
                    .into_iter()
                    .map(|l| PosLine {
                        product_id: l.product_id,
                        quantity: l.quantity,
                    })
                    .collect(),
            },
        )
    })
    .await??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /api/pedidos
///
/// Customers see their own orders; staff see all of them and may filter.
#[utoipa::path(
    get,
    path = "/api/pedidos",
    params(OrderQuery),
    responses(
        (status = 200, description = "Paginated list of orders", body = PageResponse<OrderResponse>),
        (status = 400, description = "Unknown status"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn list_orders(
    service: web::Data<OrderService>,
    auth: AuthUser,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let filter = OrderFilter {
        user_id: None,
        status,
        table_id: query.table_id,
    };
    let page = PageRequest::new(query.page, query.limit);
    let actor = actor(&auth);

    let orders = web::block(move || service.list(actor, filter, page)).await??;

    Ok(HttpResponse::Ok().json(PageResponse::from_page(orders, OrderResponse::from)))
}

/// GET /api/pedidos/{id}
#[utoipa::path(
    get,
    path = "/api/pedidos/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn get_order(
    service: web::Data<OrderService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let actor = actor(&auth);
    let order = web::block(move || service.get(actor, id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /api/pedidos/{id}/estado
#[utoipa::path(
    patch,
    path = "/api/pedidos/{id}/estado",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed or lost a concurrent update"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn change_status(
    service: web::Data<OrderService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ChangeStatusRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let body = body.into_inner();
    let next = body.status.parse::<OrderStatus>()?;
    let actor = actor(&auth);

    let order = web::block(move || service.change_status(actor, id, next, body.note)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /api/pedidos/{id}/cancelar
#[utoipa::path(
    post,
    path = "/api/pedidos/{id}/cancelar",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order can no longer be cancelled"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn cancel_order(
    service: web::Data<OrderService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let actor = actor(&auth);
    let order = web::block(move || service.cancel(actor, id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /api/pedidos/{id}/historial
#[utoipa::path(
    get,
    path = "/api/pedidos/{id}/historial",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Status changes, oldest first", body = Vec<StatusChangeResponse>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn order_history(
    service: web::Data<OrderService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let actor = actor(&auth);
    let history = web::block(move || service.history(actor, id)).await??;
    Ok(HttpResponse::Ok().json(
        history
            .into_iter()
            .map(StatusChangeResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/pedidos/{id}/items
#[utoipa::path(
    get,
    path = "/api/pedidos/{id}/items",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order lines", body = Vec<OrderItemResponse>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn list_items(
    service: web::Data<OrderService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let actor = actor(&auth);
    let items = web::block(move || service.items(actor, id)).await??;
    Ok(HttpResponse::Ok().json(
        items
            .into_iter()
            .map(OrderItemResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/pedidos/{id}/items
#[utoipa::path(
    post,
    path = "/api/pedidos/{id}/items",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = AddOrderItemRequest,
    responses(
        (status = 200, description = "Order with the new line", body = OrderResponse),
        (status = 400, description = "Invalid quantity or inactive product"),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Order no longer accepts changes"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn add_item(
    service: web::Data<OrderService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<AddOrderItemRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let body = body.into_inner();

    let order =
        web::block(move || service.add_item(id, body.product_id, body.quantity)).await??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// DELETE /api/pedidos/{id}/items/{item_id}
#[utoipa::path(
    delete,
    path = "/api/pedidos/{id}/items/{item_id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("item_id" = Uuid, Path, description = "Order item UUID"),
    ),
    responses(
        (status = 200, description = "Order without the line", body = OrderResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Order or item not found"),
        (status = 409, description = "Order no longer accepts changes"),
    ),
    security(("bearer_auth" = [])),
    tag = "pedidos"
)]
pub async fn remove_item(
    service: web::Data<OrderService>,
    auth: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let (id, item_id) = path.into_inner();
    let order = web::block(move || service.remove_item(id, item_id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /api/estados-pedido
#[utoipa::path(
    get,
    path = "/api/estados-pedido",
    responses((status = 200, description = "Statuses in workflow order", body = Vec<OrderStatusResponse>)),
    tag = "pedidos"
)]
pub async fn list_statuses(service: web::Data<OrderService>) -> Result<HttpResponse, AppError> {
    let statuses = web::block(move || service.statuses()).await??;
    Ok(HttpResponse::Ok().json(
        statuses
            .into_iter()
            .map(OrderStatusResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use std::sync::Arc;

    use crate::application::fakes::InMemoryStore;
    use crate::auth::JwtKeys;
    use crate::domain::account::Role;
    use crate::domain::ports::CartRepository;
    use crate::errors::json_error_handler;

    fn keys() -> JwtKeys {
        JwtKeys::new("handler-secret", chrono::Duration::hours(1))
    }

    fn service(store: &Arc<InMemoryStore>) -> web::Data<OrderService> {
        web::Data::new(OrderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ))
    }

    #[actix_web::test]
    async fn listing_requires_a_token() {
        let store = InMemoryStore::new();
        let app = test::init_service(
            App::new()
                .app_data(service(&store))
                .app_data(web::Data::new(keys()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/pedidos").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }

    #[actix_web::test]
    async fn customers_cannot_change_status() {
        let store = InMemoryStore::new();
        let keys = keys();
        let token = keys.issue(Uuid::new_v4(), Role::Customer).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(service(&store))
                .app_data(web::Data::new(keys))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::patch()
            .uri(&format!("/pedidos/{}/estado", Uuid::new_v4()))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(serde_json::json!({ "status": "PREPARING" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
    }

    #[actix_web::test]
    async fn malformed_checkout_body_is_rejected_and_cart_kept() {
        let store = InMemoryStore::new();
        let user = store.seed_user("ana@cafe.test", Role::Customer);
        let latte = store.seed_product("Latte", "3.00", true);
        let carts: Arc<dyn CartRepository> = store.clone();
        let cart = carts.get_or_create(user.id).unwrap();
        carts.add_to_line(cart.id, latte.id, 1, latte.price).unwrap();
        let keys = keys();
        let token = keys.issue(user.id, Role::Customer).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(service(&store))
                .app_data(web::Data::new(keys))
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/pedidos/checkout")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(serde_json::json!({ "address_id": "not-a-uuid" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = test::TestRequest::post()
            .uri("/pedidos/checkout")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        assert_eq!(carts.get_or_create(user.id).unwrap().items.len(), 1);
    }

    #[actix_web::test]
    async fn checkout_of_empty_cart_is_rejected() {
        let store = InMemoryStore::new();
        let user = store.seed_user("ana@cafe.test", Role::Customer);
        let keys = keys();
        let token = keys.issue(user.id, Role::Customer).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(service(&store))
                .app_data(web::Data::new(keys))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/pedidos/checkout")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn unknown_status_filter_is_a_bad_request() {
        let store = InMemoryStore::new();
        let keys = keys();
        let token = keys.issue(Uuid::new_v4(), Role::Admin).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(service(&store))
                .app_data(web::Data::new(keys))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/pedidos?status=LOST")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn statuses_are_public() {
        let store = InMemoryStore::new();
        let app = test::init_service(
            App::new()
                .app_data(service(&store))
                .app_data(web::Data::new(keys()))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/estados-pedido").to_request();
        let statuses: Vec<serde_json::Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(statuses.len(), 6);
        assert_eq!(statuses[0]["code"], "PENDING");
    }
}
