use bigdecimal::BigDecimal;
use std::str::FromStr;

use super::errors::DomainError;

/// Largest amount a `NUMERIC(12, 2)` column holds.
pub fn max_amount() -> BigDecimal {
    BigDecimal::new(999_999_999_999_i64.into(), 2)
}

/// Rejects amounts that would not fit in a money column.
pub fn ensure_storable(field: &str, amount: BigDecimal) -> Result<BigDecimal, DomainError> {
    if amount > max_amount() {
        return Err(DomainError::invalid(format!("{field} is too large")));
    }
    Ok(amount)
}

/// Parses a decimal amount such as `"9.99"`. Amounts must be non-negative and
/// carry at most two decimal places.
pub fn parse_amount(field: &str, raw: &str) -> Result<BigDecimal, DomainError> {
    let value = BigDecimal::from_str(raw.trim())
        .map_err(|e| DomainError::invalid(format!("invalid {field} '{raw}': {e}")))?;
    if value < BigDecimal::from(0) {
        return Err(DomainError::invalid(format!("{field} must not be negative")));
    }
    let (_, scale) = value.normalized().as_bigint_and_exponent();
    if scale > 2 {
        return Err(DomainError::invalid(format!(
            "{field} must have at most two decimal places"
        )));
    }
    ensure_storable(field, value)
}

/// `unit_price * quantity`, bounded like every stored amount.
pub fn line_subtotal(unit_price: &BigDecimal, quantity: i32) -> Result<BigDecimal, DomainError> {
    ensure_storable("subtotal", unit_price * BigDecimal::from(quantity))
}

pub fn sum<'a>(amounts: impl IntoIterator<Item = &'a BigDecimal>) -> BigDecimal {
    amounts
        .into_iter()
        .fold(BigDecimal::from(0), |acc, amount| acc + amount)
}

pub fn validate_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity <= 0 {
        return Err(DomainError::invalid("quantity must be greater than zero"));
    }
    Ok(())
}
