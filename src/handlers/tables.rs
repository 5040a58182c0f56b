use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::TableService;
use crate::auth::AuthUser;
use crate::domain::table::{DiningTable, TableInput, TableState};
use crate::errors::AppError;

use super::timestamp;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TableQuery {
    /// RFC 3339 instant; only tables changed after it are returned.
    #[param(value_type = Option<String>)]
    pub updated_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TableRequest {
    pub number: i32,
    pub capacity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeTableStateRequest {
    /// `FREE`, `OCCUPIED` or `RESERVED`.
    pub state: String,
    /// `updated_at` as last read by the caller; a mismatch answers 409.
    #[schema(value_type = Option<String>)]
    pub expected_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TableResponse {
    pub id: Uuid,
    pub number: i32,
    pub capacity: i32,
    pub state: String,
    pub current_order_id: Option<Uuid>,
    pub updated_at: String,
}

impl From<DiningTable> for TableResponse {
    fn from(t: DiningTable) -> Self {
        TableResponse {
            id: t.id,
            number: t.number,
            capacity: t.capacity,
            state: t.state.to_string(),
            current_order_id: t.current_order_id,
            updated_at: timestamp(&t.updated_at),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/mesas")
            .route("", web::get().to(list_tables))
            .route("", web::post().to(create_table))
            .route("/{id}", web::get().to(get_table))
            .route("/{id}", web::put().to(update_table))
            .route("/{id}", web::delete().to(delete_table))
            .route("/{id}/estado", web::patch().to(change_state)),
    );
}

/// GET /api/mesas
///
/// Polled by the POS; pass the newest `updated_at` seen to get only changes.
#[utoipa::path(
    get,
    path = "/api/mesas",
    params(TableQuery),
    responses((status = 200, description = "Tables ordered by number", body = Vec<TableResponse>)),
    security(("bearer_auth" = [])),
    tag = "mesas"
)]
pub async fn list_tables(
    service: web::Data<TableService>,
    auth: AuthUser,
    query: web::Query<TableQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let since = query.updated_since;
    let tables = web::block(move || service.list(since)).await??;
    Ok(HttpResponse::Ok().json(
        tables
            .into_iter()
            .map(TableResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// GET /api/mesas/{id}
#[utoipa::path(
    get,
    path = "/api/mesas/{id}",
    params(("id" = Uuid, Path, description = "Table UUID")),
    responses(
        (status = 200, description = "Table found", body = TableResponse),
        (status = 404, description = "Table not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "mesas"
)]
pub async fn get_table(
    service: web::Data<TableService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let table = web::block(move || service.get(id)).await??;
    Ok(HttpResponse::Ok().json(TableResponse::from(table)))
}

/// POST /api/mesas
#[utoipa::path(
    post,
    path = "/api/mesas",
    request_body = TableRequest,
    responses(
        (status = 201, description = "Table created", body = TableResponse),
        (status = 400, description = "Invalid number or capacity"),
        (status = 409, description = "Number already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "mesas"
)]
pub async fn create_table(
    service: web::Data<TableService>,
    auth: AuthUser,
    body: web::Json<TableRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let input = TableInput {
        number: body.number,
        capacity: body.capacity,
    };
    let table = web::block(move || service.create(input)).await??;
    Ok(HttpResponse::Created().json(TableResponse::from(table)))
}

/// PUT /api/mesas/{id}
#[utoipa::path(
    put,
    path = "/api/mesas/{id}",
    params(("id" = Uuid, Path, description = "Table UUID")),
    request_body = TableRequest,
    responses(
        (status = 200, description = "Table updated", body = TableResponse),
        (status = 404, description = "Table not found"),
        (status = 409, description = "Number already used"),
    ),
    security(("bearer_auth" = [])),
    tag = "mesas"
)]
pub async fn update_table(
    service: web::Data<TableService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<TableRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let input = TableInput {
        number: body.number,
        capacity: body.capacity,
    };
    let table = web::block(move || service.update(id, input)).await??;
    Ok(HttpResponse::Ok().json(TableResponse::from(table)))
}

/// DELETE /api/mesas/{id}
#[utoipa::path(
    delete,
    path = "/api/mesas/{id}",
    params(("id" = Uuid, Path, description = "Table UUID")),
    responses(
        (status = 204, description = "Table deleted"),
        (status = 404, description = "Table not found"),
        (status = 409, description = "Table is occupied"),
    ),
    security(("bearer_auth" = [])),
    tag = "mesas"
)]
pub async fn delete_table(
    service: web::Data<TableService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    web::block(move || service.delete(id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

/// PATCH /api/mesas/{id}/estado
#[utoipa::path(
    patch,
    path = "/api/mesas/{id}/estado",
    params(("id" = Uuid, Path, description = "Table UUID")),
    request_body = ChangeTableStateRequest,
    responses(
        (status = 200, description = "State changed", body = TableResponse),
        (status = 400, description = "Unknown state"),
        (status = 404, description = "Table not found"),
        (status = 409, description = "Transition not allowed or stale timestamp"),
    ),
    security(("bearer_auth" = [])),
    tag = "mesas"
)]
pub async fn change_state(
    service: web::Data<TableService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ChangeTableStateRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_staff()?;
    let id = path.into_inner();
    let next = body.state.parse::<TableState>()?;
    let expected = body.expected_updated_at;

    let table = web::block(move || service.change_state(id, next, expected)).await??;

    Ok(HttpResponse::Ok().json(TableResponse::from(table)))
}
