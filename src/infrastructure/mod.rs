pub mod account_repo;
pub mod address_repo;
pub mod cart_repo;
pub mod catalog_repo;
pub mod models;
pub mod order_repo;
pub mod payment_repo;
pub mod review_repo;
pub mod table_repo;

#[cfg(test)]
pub(crate) mod test_support;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::domain::errors::DomainError;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation,
                info,
            ) => DomainError::Conflict(
                constraint_message(info.constraint_name())
                    .map(str::to_string)
                    .unwrap_or_else(|| info.message().to_string()),
            ),
            DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                DomainError::InvalidInput(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

/// Client-facing wording for the constraints a request can trip over.
fn constraint_message(constraint: Option<&str>) -> Option<&'static str> {
    let message = match constraint? {
        "users_email_key" => "email is already registered",
        "orders_user_id_fkey" => "user has orders",
        "vendors_user_id_key" => "user already has a vendor profile",
        "categories_name_key" => "category name already exists",
        "products_category_id_fkey" => "category has associated products",
        "order_items_product_id_fkey" => "product is referenced by orders",
        "payment_methods_name_key" => "payment method already exists",
        "orders_payment_method_id_fkey" => "payment method is used by orders",
        "reviews_product_id_user_id_key" => "product already reviewed by this user",
        "dining_tables_number_key" => "table number already exists",
        "addresses_one_principal_per_user" => "principal address changed concurrently",
        "cart_items_cart_id_product_id_key" => "cart changed concurrently",
        _ => return None,
    };
    Some(message)
}
