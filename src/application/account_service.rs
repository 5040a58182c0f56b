use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{JwtKeys, PasswordHasher};
use crate::domain::account::{
    normalize_email, validate_password, NewUser, Role, RoleInfo, User, UserChanges,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::{optional_text, required_text, Page, PageRequest};

#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    keys: JwtKeys,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher, keys: JwtKeys) -> Self {
        Self {
            users,
            hasher,
            keys,
        }
    }

    pub fn register(&self, input: Registration) -> Result<User, DomainError> {
        let name = required_text("name", &input.name, 120)?;
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;
        let phone = optional_text("phone", input.phone, 30)?;

        if self.users.find_by_email(&email)?.is_some() {
            return Err(DomainError::conflict("email already registered"));
        }

        let user = self.users.create(NewUser {
            name,
            email,
            password_hash: self.hasher.hash(&input.password)?,
            phone,
            role: Role::Customer,
        })?;
        log::info!("registered user {}", user.id);
        Ok(user)
    }

    /// Returns a signed token together with the authenticated user.
    pub fn login(&self, email: &str, password: &str) -> Result<(String, User), DomainError> {
        let invalid = || DomainError::Unauthorized("invalid email or password".into());
        let email = normalize_email(email).map_err(|_| invalid())?;

        let user = self.users.find_by_email(&email)?.ok_or_else(invalid)?;
        if !self.hasher.verify(password, &user.password_hash)? {
            log::warn!("failed login for user {}", user.id);
            return Err(invalid());
        }
        if !user.is_active {
            return Err(DomainError::Forbidden("account is disabled".into()));
        }

        let token = self.keys.issue(user.id, user.role)?;
        Ok((token, user))
    }

    /// Current state of the account behind a token: deleted accounts are
    /// unauthorized, disabled ones forbidden.
    pub fn session_user(&self, user_id: Uuid) -> Result<User, DomainError> {
        let user = self
            .users
            .find_by_id(user_id)?
            .ok_or_else(|| DomainError::Unauthorized("account no longer exists".into()))?;
        if !user.is_active {
            return Err(DomainError::Forbidden("account is disabled".into()));
        }
        Ok(user)
    }

    pub fn profile(&self, user_id: Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(user_id)?
            .ok_or(DomainError::NotFound("User"))
    }

    pub fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<User, DomainError> {
        let changes = UserChanges {
            name: name.map(|n| required_text("name", &n, 120)).transpose()?,
            phone: match phone {
                Some(p) => Some(optional_text("phone", Some(p), 30)?),
                None => None,
            },
            ..UserChanges::default()
        };
        self.users
            .update(user_id, changes)?
            .ok_or(DomainError::NotFound("User"))
    }

    pub fn change_password(
        &self,
        user_id: Uuid,
        current: &str,
        new_password: &str,
    ) -> Result<(), DomainError> {
        let user = self.profile(user_id)?;
        if !self.hasher.verify(current, &user.password_hash)? {
            return Err(DomainError::Unauthorized(
                "current password is incorrect".into(),
            ));
        }
        validate_password(new_password)?;
        let hash = self.hasher.hash(new_password)?;
        if !self.users.update_password(user_id, hash)? {
            return Err(DomainError::NotFound("User"));
        }
        log::info!("password changed for user {}", user_id);
        Ok(())
    }

    pub fn list_users(&self, page: PageRequest) -> Result<Page<User>, DomainError> {
        self.users.list(page)
    }

    pub fn get_user(&self, id: Uuid) -> Result<User, DomainError> {
        self.profile(id)
    }

    pub fn update_user(&self, id: Uuid, update: AdminUserUpdate) -> Result<User, DomainError> {
        let changes = UserChanges {
            name: update
                .name
                .map(|n| required_text("name", &n, 120))
                .transpose()?,
            phone: match update.phone {
                Some(p) => Some(optional_text("phone", Some(p), 30)?),
                None => None,
            },
            role: update.role_id.map(Role::from_id).transpose()?,
            is_active: update.is_active,
        };
        self.users
            .update(id, changes)?
            .ok_or(DomainError::NotFound("User"))
    }

    pub fn delete_user(&self, id: Uuid) -> Result<(), DomainError> {
        if self.users.delete(id)? {
            Ok(())
        } else {
            Err(DomainError::NotFound("User"))
        }
    }

    pub fn roles(&self) -> Result<Vec<RoleInfo>, DomainError> {
        self.users.list_roles()
    }
}
