use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use crate::application::AccountService;
use crate::domain::account::Role;
use crate::domain::errors::DomainError;
use crate::errors::AppError;

// ── Passwords ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plain: &str) -> Result<String, DomainError> {
        bcrypt::hash(plain, self.cost).map_err(|e| DomainError::Internal(e.to_string()))
    }

    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, DomainError> {
        bcrypt::verify(plain, hash).map_err(|e| DomainError::Internal(e.to_string()))
    }
}

// ── Tokens ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, DomainError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role: role.as_str().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| DomainError::Internal(format!("failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, DomainError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| DomainError::Unauthorized(format!("invalid token: {e}")))
    }
}

// ── Request extractor ────────────────────────────────────────────────────────

/// The caller identified by the bearer token of the request.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            log::warn!("user {} ({}) denied, needs one of {:?}", self.id, self.role, allowed);
            Err(AppError::Forbidden("insufficient role".into()))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Admin])
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require_role(&[Role::Admin, Role::Vendor])
    }

    /// Identity and role as claimed by the token alone.
    fn from_token(req: &HttpRequest) -> Result<Self, AppError> {
        let keys = req
            .app_data::<web::Data<JwtKeys>>()
            .ok_or_else(|| AppError::Internal("JWT keys are not registered".into()))?;
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

        let claims = keys.verify(token).map_err(|e| {
            log::debug!("rejected token: {}", e);
            AppError::from(e)
        })?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| AppError::Unauthorized("token carries an unknown role".into()))?;

        Ok(AuthUser {
            id: claims.sub,
            role,
        })
    }
}

/// When the account service is registered the account is re-read on every
/// request, so a deleted, disabled or re-roled user is seen at once instead
/// of when the token expires.
impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claimed = Self::from_token(req);
        let accounts = req.app_data::<web::Data<AccountService>>().cloned();

        Box::pin(async move {
            let claimed = claimed?;
            let Some(accounts) = accounts else {
                return Ok(claimed);
            };
            let user = web::block(move || accounts.session_user(claimed.id)).await??;
            if user.role != claimed.role {
                log::info!(
                    "user {} now acts as {} (token said {})",
                    user.id,
                    user.role,
                    claimed.role
                );
            }
            Ok(AuthUser {
                id: user.id,
                role: user.role,
            })
        })
    }
}
