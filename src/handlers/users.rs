use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::account_service::{AdminUserUpdate, Registration};
use crate::application::AccountService;
use crate::auth::AuthUser;
use crate::domain::account::{RoleInfo, User};
use crate::errors::AppError;

use super::{timestamp, PageParams, PageResponse};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    /// At least 8 characters.
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for the `Authorization` header.
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    /// `ADMIN`, `VENDOR` or `CUSTOMER`.
    pub role: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        UserResponse {
            id: u.id,
            role: u.role.to_string(),
            name: u.name,
            email: u.email,
            phone: u.phone,
            is_active: u.is_active,
            created_at: timestamp(&u.created_at),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    /// An empty string clears the phone number.
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    /// 1 = ADMIN, 2 = VENDOR, 3 = CUSTOMER.
    pub role_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<RoleInfo> for RoleResponse {
    fn from(r: RoleInfo) -> Self {
        RoleResponse {
            id: r.id,
            name: r.name,
            description: r.description,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/usuarios")
            .route("", web::get().to(list_users))
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(me))
            .route("/me", web::put().to(update_me))
            .route("/me/password", web::put().to(change_password))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user)),
    )
    .route("/roles", web::get().to(list_roles));
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/usuarios/register
///
/// Creates a customer account.
#[utoipa::path(
    post,
    path = "/api/usuarios/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "usuarios"
)]
pub async fn register(
    service: web::Data<AccountService>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let user = web::block(move || {
        service.register(Registration {
            name: body.name,
            email: body.email,
            password: body.password,
            phone: body.phone,
        })
    })
    .await??;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// POST /api/usuarios/login
#[utoipa::path(
    post,
    path = "/api/usuarios/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 403, description = "Account disabled"),
    ),
    tag = "usuarios"
)]
pub async fn login(
    service: web::Data<AccountService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let (token, user) = web::block(move || service.login(&body.email, &body.password)).await??;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: user.into(),
    }))
}

/// GET /api/usuarios/me
#[utoipa::path(
    get,
    path = "/api/usuarios/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn me(
    service: web::Data<AccountService>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    let user = web::block(move || service.profile(auth.id)).await??;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/usuarios/me
#[utoipa::path(
    put,
    path = "/api/usuarios/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn update_me(
    service: web::Data<AccountService>,
    auth: AuthUser,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let user =
        web::block(move || service.update_profile(auth.id, body.name, body.phone)).await??;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/usuarios/me/password
#[utoipa::path(
    put,
    path = "/api/usuarios/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "New password too short"),
        (status = 401, description = "Current password is incorrect"),
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn change_password(
    service: web::Data<AccountService>,
    auth: AuthUser,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    web::block(move || {
        service.change_password(auth.id, &body.current_password, &body.new_password)
    })
    .await??;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/usuarios
#[utoipa::path(
    get,
    path = "/api/usuarios",
    params(PageParams),
    responses(
        (status = 200, description = "Paginated list of users", body = PageResponse<UserResponse>),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn list_users(
    service: web::Data<AccountService>,
    auth: AuthUser,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let page = query.request();

    let users = web::block(move || service.list_users(page)).await??;

    Ok(HttpResponse::Ok().json(PageResponse::from_page(users, UserResponse::from)))
}

/// GET /api/usuarios/{id}
#[utoipa::path(
    get,
    path = "/api/usuarios/{id}",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn get_user(
    service: web::Data<AccountService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();

    let user = web::block(move || service.get_user(id)).await??;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/usuarios/{id}
#[utoipa::path(
    put,
    path = "/api/usuarios/{id}",
    params(("id" = Uuid, Path, description = "User UUID")),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid input or unknown role"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn update_user(
    service: web::Data<AccountService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<AdminUpdateUserRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();
    let body = body.into_inner();

    let user = web::block(move || {
        service.update_user(
            id,
            AdminUserUpdate {
                name: body.name,
                phone: body.phone,
                role_id: body.role_id,
                is_active: body.is_active,
            },
        )
    })
    .await??;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// DELETE /api/usuarios/{id}
#[utoipa::path(
    delete,
    path = "/api/usuarios/{id}",
    params(("id" = Uuid, Path, description = "User UUID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Admins only"),
        (status = 404, description = "User not found"),
        (status = 409, description = "User has orders"),
    ),
    security(("bearer_auth" = [])),
    tag = "usuarios"
)]
pub async fn delete_user(
    service: web::Data<AccountService>,
    auth: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let id = path.into_inner();

    web::block(move || service.delete_user(id)).await??;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/roles
#[utoipa::path(
    get,
    path = "/api/roles",
    responses(
        (status = 200, description = "Seeded roles", body = Vec<RoleResponse>),
        (status = 403, description = "Admins only"),
    ),
    security(("bearer_auth" = [])),
    tag = "roles"
)]
pub async fn list_roles(
    service: web::Data<AccountService>,
    auth: AuthUser,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let roles = web::block(move || service.roles()).await??;

    Ok(HttpResponse::Ok().json(
        roles
            .into_iter()
            .map(RoleResponse::from)
            .collect::<Vec<_>>(),
    ))
}
