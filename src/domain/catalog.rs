use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<BigDecimal>,
    pub stock: Option<i32>,
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub include_inactive: bool,
}

impl Product {
    /// Whether the product can be put in a cart or on an order.
    pub fn is_sellable(&self) -> bool {
        self.is_active
    }
}
