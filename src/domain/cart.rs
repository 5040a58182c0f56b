use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::DomainError;
use super::money;

#[derive(Debug, Clone)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total: BigDecimal,
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_for_product(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Recomputes `total` from the lines.
    pub fn computed_total(&self) -> BigDecimal {
        money::sum(self.items.iter().map(|i| &i.subtotal))
    }
}

/// A line the repository must persist: the quantity already merged with any
/// existing line for the same product.
#[derive(Debug, Clone)]
pub struct CartLineWrite {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

impl CartLineWrite {
    pub fn new(
        product_id: Uuid,
        quantity: i32,
        unit_price: BigDecimal,
    ) -> Result<Self, DomainError> {
        let subtotal = money::line_subtotal(&unit_price, quantity)?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            subtotal,
        })
    }

    /// Adds `quantity` units on top of an existing line's quantity.
    pub fn merged(
        product_id: Uuid,
        existing: Option<i32>,
        quantity: i32,
        unit_price: BigDecimal,
    ) -> Result<Self, DomainError> {
        let merged = existing
            .unwrap_or(0)
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invalid("quantity is too large"))?;
        Self::new(product_id, merged, unit_price)
    }
}
