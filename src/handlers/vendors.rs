use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::vendor_service::VendorPatch;
use crate::application::VendorService;
use crate::auth::AuthUser;
use crate::domain::account::{NewVendor, Vendor};
use crate::errors::AppError;

use super::timestamp;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVendorRequest {
    /// Existing user that becomes the vendor.
    pub user_id: Uuid,
    pub business_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateVendorRequest {
    pub business_name: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VendorResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<Vendor> for VendorResponse {
    fn from(v: Vendor) -> Self {
        VendorResponse {
            id: v.id,
            user_id: v.user_id,
            business_name: v.business_name,
            description: v.description,
            phone: v.phone,
            is_active: v.is_active,
            created_at: timestamp(&v.created_at),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/vendedores")
            .route("", web::get().to(list_vendors))
            .route("", web::post().to(create_vendor))
            .route("/{id}", web::get().to(get_vendor))
            .route("/{id}", web::put().to(update_vendor))
            .route("/{id}", web::delete().to(delete_vendor)),
    );
}

/// GET /api/vendedores
#[utoipa::path(
    get,
    path = "/api/vendedores",
    responses((status = 200, description = "All vendors", body = Vec<VendorResponse>)),
    tag = "vendedores"
)]
pub async fn list_vendors(service: web::Data<VendorService>) -> Result<HttpResponse, AppError> {
    let vendors = web::block(move || service.list()).await??;
    Ok(HttpResponse::Ok().json(
        vendors
            .into_iter()
            .map(VendorResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/vendedores/{id}
#[utoipa::path(
    get,
    path = "/api/vendedores/{id}",
    params(("id" = Uuid, Path, description = "Vendor UUID")),
    responses(
        (status = 200, description = "Vendor found", body = VendorResponse),
        (status = 404, description = "Vendor not found"),
    ),
    tag = "vendedores"
)]
pub async fn get_vendor(
    service: web::Data<VendorService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let vendor = web::block(move || service.get(id)).await??;
    Ok(HttpResponse::Ok().json(VendorResponse::from(vendor)))
}

/// POST /api/vendedores
///
/// Links a vendor profile to an existing user and promotes a customer to
/// the VENDOR role.
#[utoipa::path(
    post,
    path = "/api/vendedores",
    request_body = CreateVendorRequest,
    responses(
        (status = 201, description = "Vendor created", body = VendorResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User already has a vendor profile"),
    ),
    security(("bearer_auth" = [])),
    tag = "vendedores"
)]
pub async fn create_vendor(
    service: web::Data<VendorService>,
    auth: AuthUser,
    body: web::Json<CreateVendorRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let body = body.into_inner();

    let vendor = web::block(move || {
        service.create(NewVendor {
            user_id: body.user_id,
            business_name: body.business_name,
            description: body.description,
            phone: body.phone,
        })
    })
    .await??;

    Ok(HttpResponse::Created().json(VendorResponse::from(vendor)))
}

/// PUT /api/vendedores/{id}
#[utoipa::path(
    put,
    path = "/api/vendedores/{id}",
    params(("id" = Uuid, Path, description = "Vendor UUID")),
    request_body = UpdateVendorRequest,
    responses(
        (status = 200, description = "Vendor updated", body = VendorResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Vendor not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "vendedores"
)]
pub async fn update_vendor(
    service: web::Data<VendorService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateVendorRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    let body = body.into_inner();

    let vendor = web::block(move || {
        service.update(
            id,
            VendorPatch {
                business_name: body.business_name,
                description: body.description,
                phone: body.phone,
                is_active: body.is_active,
            },
        )
    })
    .await??;

    Ok(HttpResponse::Ok().json(VendorResponse::from(vendor)))
}

/// DELETE /api/vendedores/{id}
#[utoipa::path(
    delete,
    path = "/api/vendedores/{id}",
    params(("id" = Uuid, Path, description = "Vendor UUID")),
    responses(
        (status = 204, description = "Vendor deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "Vendor not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "vendedores"
)]
pub async fn delete_vendor(
    service: web::Data<VendorService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    web::block(move || service.delete(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}
