use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::PaymentService;
use crate::auth::AuthUser;
use crate::domain::payment::{NewPaymentMethod, PaymentMethod};
use crate::errors::AppError;

use super::timestamp;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentMethodQuery {
    /// Staff only.
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentMethodRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentMethodRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentMethodResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<PaymentMethod> for PaymentMethodResponse {
    fn from(m: PaymentMethod) -> Self {
        PaymentMethodResponse {
            id: m.id,
            name: m.name,
            description: m.description,
            is_active: m.is_active,
            created_at: timestamp(&m.created_at),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/metodos-pago")
            .route("", web::get().to(list_methods))
            .route("", web::post().to(create_method))
            .route("/{id}", web::get().to(get_method))
            .route("/{id}", web::put().to(update_method))
            .route("/{id}", web::delete().to(delete_method)),
    );
}

/// GET /api/metodos-pago
#[utoipa::path(
    get,
    path = "/api/metodos-pago",
    params(PaymentMethodQuery),
    responses((status = 200, description = "Payment methods ordered by name", body = Vec<PaymentMethodResponse>)),
    tag = "metodos-pago"
)]
pub async fn list_methods(
    service: web::Data<PaymentService>,
    auth: Option<AuthUser>,
    query: web::Query<PaymentMethodQuery>,
) -> Result<HttpResponse, AppError> {
    let include_inactive = query.include_inactive && auth.is_some_and(|a| a.is_staff());
    let methods = web::block(move || service.list(include_inactive)).await??;
    Ok(HttpResponse::Ok().json(
        methods
            .into_iter()
            .map(PaymentMethodResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/metodos-pago/{id}
#[utoipa::path(
    get,
    path = "/api/metodos-pago/{id}",
    params(("id" = Uuid, Path, description = "Payment method UUID")),
    responses(
        (status = 200, description = "Payment method found", body = PaymentMethodResponse),
        (status = 404, description = "Payment method not found"),
    ),
    tag = "metodos-pago"
)]
pub async fn get_method(
    service: web::Data<PaymentService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let method = web::block(move || service.get(id)).await??;
    Ok(HttpResponse::Ok().json(PaymentMethodResponse::from(method)))
}

/// POST /api/metodos-pago
#[utoipa::path(
    post,
    path = "/api/metodos-pago",
    request_body = CreatePaymentMethodRequest,
    responses(
        (status = 201, description = "Payment method created", body = PaymentMethodResponse),
        (status = 403, description = "Admins only"),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "metodos-pago"
)]
pub async fn create_method(
    service: web::Data<PaymentService>,
    auth: AuthUser,
    body: web::Json<CreatePaymentMethodRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let body = body.into_inner();

    let method = web::block(move || {
        service.create(NewPaymentMethod {
            name: body.name,
            description: body.description,
        })
    })
    .await??;

    Ok(HttpResponse::Created().json(PaymentMethodResponse::from(method)))
}

/// PUT /api/metodos-pago/{id}
#[utoipa::path(
    put,
    path = "/api/metodos-pago/{id}",
    params(("id" = Uuid, Path, description = "Payment method UUID")),
    request_body = UpdatePaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method updated", body = PaymentMethodResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Payment method not found"),
        (status = 409, description = "Name already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "metodos-pago"
)]
pub async fn update_method(
    service: web::Data<PaymentService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentMethodRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    let body = body.into_inner();

    let method = web::block(move || {
        service.update(id, body.name, body.description, body.is_active)
    })
    .await??;

    Ok(HttpResponse::Ok().json(PaymentMethodResponse::from(method)))
}

/// DELETE /api/metodos-pago/{id}
#[utoipa::path(
    delete,
    path = "/api/metodos-pago/{id}",
    params(("id" = Uuid, Path, description = "Payment method UUID")),
    responses(
        (status = 204, description = "Payment method deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Payment method not found"),
        (status = 409, description = "Payment method is used by orders"),
    ),
    security(("bearer_auth" = [])),
    tag = "metodos-pago"
)]
pub async fn delete_method(
    service: web::Data<PaymentService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    web::block(move || service.delete(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
