use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::errors::DomainError;

/// Seeded roles. The discriminants match the `roles.id` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin = 1,
    Vendor = 2,
    Customer = 3,
}

impl Role {
    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Result<Self, DomainError> {
        match id {
            1 => Ok(Role::Admin),
            2 => Ok(Role::Vendor),
            3 => Ok(Role::Customer),
            other => Err(DomainError::invalid(format!("unknown role id {other}"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Vendor => "VENDOR",
            Role::Customer => "CUSTOMER",
        }
    }

    /// Admins and vendors operate the point of sale.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Vendor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "VENDOR" => Ok(Role::Vendor),
            "CUSTOMER" => Ok(Role::Customer),
            other => Err(DomainError::invalid(format!("unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoleInfo {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct Vendor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVendor {
    pub user_id: Uuid,
    pub business_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VendorChanges {
    pub business_name: Option<String>,
    pub description: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub is_active: Option<bool>,
}

pub const MIN_PASSWORD_LEN: usize = 8;

/// Lowercases and sanity-checks an e-mail address.
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
        }
        None => false,
    };
    if !valid || email.len() > 255 || email.contains(char::is_whitespace) {
        return Err(DomainError::invalid("email is not a valid address"));
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::invalid(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_match_seed_data() {
        assert_eq!(Role::Admin.id(), 1);
        assert_eq!(Role::from_id(2).unwrap(), Role::Vendor);
        assert!(Role::from_id(9).is_err());
    }

    #[test]
    fn role_string_round_trip() {
        for role in [Role::Admin, Role::Vendor, Role::Customer] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn only_admin_and_vendor_are_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Vendor.is_staff());
        assert!(!Role::Customer.is_staff());
    }

    #[test]
    fn email_is_lowercased() {
        assert_eq!(
            normalize_email("  Ana@Cafe.COM ").unwrap(),
            "ana@cafe.com".to_string()
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "ana", "ana@", "@cafe.com", "ana@cafe", "a na@cafe.com", "a@b@c.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }
}
