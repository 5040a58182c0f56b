use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::AddressService;
use crate::auth::AuthUser;
use crate::domain::address::{Address, AddressInput};
use crate::errors::AppError;

use super::timestamp;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddressRequest {
    /// Free-form name such as "Casa" or "Oficina".
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    /// Delivery hint for the courier.
    pub reference: Option<String>,
}

impl From<AddressRequest> for AddressInput {
    fn from(r: AddressRequest) -> Self {
        AddressInput {
            label: r.label,
            street: r.street,
            city: r.city,
            region: r.region,
            postal_code: r.postal_code,
            country: r.country,
            reference: r.reference,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressResponse {
    pub id: Uuid,
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub reference: Option<String>,
    pub is_principal: bool,
    pub created_at: String,
}

impl From<Address> for AddressResponse {
    fn from(a: Address) -> Self {
        AddressResponse {
            id: a.id,
            label: a.label,
            street: a.street,
            city: a.city,
            region: a.region,
            postal_code: a.postal_code,
            country: a.country,
            reference: a.reference,
            is_principal: a.is_principal,
            created_at: timestamp(&a.created_at),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/direcciones")
            .route("", web::get().to(list_addresses))
            .route("", web::post().to(create_address))
            .route("/{id}", web::get().to(get_address))
            .route("/{id}", web::put().to(update_address))
            .route("/{id}", web::delete().to(delete_address))
            .route("/{id}/principal", web::patch().to(set_principal)),
    );
}

/// GET /api/direcciones
///
/// The caller's addresses, principal first.
#[utoipa::path(
    get,
    path = "/api/direcciones",
    responses((status = 200, description = "Own addresses", body = Vec<AddressResponse>)),
    security(("bearer_auth" = [])),
    tag = "direcciones"
)]
pub async fn list_addresses(
    service: web::Data<AddressService>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let addresses = web::block(move || service.list(auth.id)).await??;
    Ok(HttpResponse::Ok().json(
        addresses
            .into_iter()
            .map(AddressResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/direcciones/{id}
#[utoipa::path(
    get,
    path = "/api/direcciones/{id}",
    params(("id" = Uuid, Path, description = "Address UUID")),
    responses(
        (status = 200, description = "Address found", body = AddressResponse),
        (status = 404, description = "Address not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "direcciones"
)]
pub async fn get_address(
    service: web::Data<AddressService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let address = web::block(move || service.get(auth.id, id)).await??;
    Ok(HttpResponse::Ok().json(AddressResponse::from(address)))
}

/// POST /api/direcciones
#[utoipa::path(
    post,
    path = "/api/direcciones",
    request_body = AddressRequest,
    responses(
        (status = 201, description = "Address created", body = AddressResponse),
        (status = 400, description = "Invalid input"),
    ),
    security(("bearer_auth" = [])),
    tag = "direcciones"
)]
pub async fn create_address(
    service: web::Data<AddressService>,
    auth: AuthUser,
    body: web::Json<AddressRequest>,
) -> Result<HttpResponse, AppError> {
    let input = AddressInput::from(body.into_inner());
    let address = web::block(move || service.create(auth.id, input)).await??;
    Ok(HttpResponse::Created().json(AddressResponse::from(address)))
}

/// PUT /api/direcciones/{id}
#[utoipa::path(
    put,
    path = "/api/direcciones/{id}",
    params(("id" = Uuid, Path, description = "Address UUID")),
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address updated", body = AddressResponse),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Address not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "direcciones"
)]
pub async fn update_address(
    service: web::Data<AddressService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<AddressRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = AddressInput::from(body.into_inner());
    let address = web::block(move || service.update(auth.id, id, input)).await??;
    Ok(HttpResponse::Ok().json(AddressResponse::from(address)))
}

/// DELETE /api/direcciones/{id}
#[utoipa::path(
    delete,
    path = "/api/direcciones/{id}",
    params(("id" = Uuid, Path, description = "Address UUID")),
    responses(
        (status = 204, description = "Address deleted"),
        (status = 404, description = "Address not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "direcciones"
)]
pub async fn delete_address(
    service: web::Data<AddressService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    web::block(move || service.delete(auth.id, id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

/// PATCH /api/direcciones/{id}/principal
#[utoipa::path(
    patch,
    path = "/api/direcciones/{id}/principal",
    params(("id" = Uuid, Path, description = "Address UUID")),
    responses(
        (status = 200, description = "Address is now the principal one", body = AddressResponse),
        (status = 404, description = "Address not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "direcciones"
)]
pub async fn set_principal(
    service: web::Data<AddressService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let address = web::block(move || service.set_principal(auth.id, id)).await??;
    Ok(HttpResponse::Ok().json(AddressResponse::from(address)))
}
