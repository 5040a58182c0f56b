use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::account::{Role, RoleInfo, User, Vendor};
use crate::domain::address::Address;
use crate::domain::catalog::{Category, Product};
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderItem, OrderStatusInfo, StatusChange};
use crate::domain::payment::PaymentMethod;
use crate::domain::review::Review;
use crate::domain::table::DiningTable;
use crate::schema::{
    addresses, cart_items, carts, categories, dining_tables, order_items, order_status_history,
    order_statuses, orders, payment_methods, products, reviews, roles, users, vendors,
};

// ── Accounts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoleRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<RoleRow> for RoleInfo {
    fn from(r: RoleRow) -> Self {
        RoleInfo {
            id: r.id,
            name: r.name,
            description: r.description,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub role_id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(u: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: u.id,
            role: Role::from_id(u.role_id)?,
            name: u.name,
            email: u.email,
            password_hash: u.password_hash,
            phone: u.phone,
            is_active: u.is_active,
            created_at: u.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub id: Uuid,
    pub role_id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserChangeset {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub role_id: Option<i32>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = vendors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VendorRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VendorRow> for Vendor {
    fn from(v: VendorRow) -> Self {
        Vendor {
            id: v.id,
            user_id: v.user_id,
            business_name: v.business_name,
            description: v.description,
            phone: v.phone,
            is_active: v.is_active,
            created_at: v.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = vendors)]
pub struct NewVendorRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub description: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = vendors)]
pub struct VendorChangeset {
    pub business_name: Option<String>,
    pub description: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(c: CategoryRow) -> Self {
        Category {
            id: c.id,
            name: c.name,
            description: c.description,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategoryRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = categories)]
#[diesel(treat_none_as_null = true)]
pub struct CategoryChangeset {
    pub name: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
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
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(p: ProductRow) -> Self {
        Product {
            id: p.id,
            category_id: p.category_id,
            vendor_id: p.vendor_id,
            name: p.name,
            description: p.description,
            price: p.price,
            stock: p.stock,
            image_url: p.image_url,
            is_active: p.is_active,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub category_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChangeset {
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Option<Uuid>>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<BigDecimal>,
    pub stock: Option<i32>,
    pub image_url: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

// ── Carts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(CartRow, foreign_key = cart_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = order_statuses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderStatusRow {
    pub code: String,
    pub label: String,
    pub sort_order: i32,
}

impl From<OrderStatusRow> for OrderStatusInfo {
    fn from(s: OrderStatusRow) -> Self {
        OrderStatusInfo {
            code: s.code,
            label: s.label,
            sort_order: s.sort_order,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub table_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub status: String,
    pub total: BigDecimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub table_id: Option<Uuid>,
    pub address_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub status: String,
    pub total: BigDecimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(i: OrderItemRow) -> Self {
        OrderItem {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price: i.unit_price,
            subtotal: i.subtotal,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_status_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StatusHistoryRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<StatusHistoryRow> for StatusChange {
    type Error = DomainError;

    fn try_from(h: StatusHistoryRow) -> Result<Self, Self::Error> {
        Ok(StatusChange {
            id: h.id,
            order_id: h.order_id,
            from_status: h.from_status.as_deref().map(str::parse).transpose()?,
            to_status: h.to_status.parse()?,
            changed_by: h.changed_by,
            note: h.note,
            created_at: h.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_status_history)]
pub struct NewStatusHistoryRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: Option<Uuid>,
    pub note: Option<String>,
}

// ── Addresses ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AddressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub reference: Option<String>,
    pub is_principal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(a: AddressRow) -> Self {
        Address {
            id: a.id,
            user_id: a.user_id,
            label: a.label,
            street: a.street,
            city: a.city,
            region: a.region,
            postal_code: a.postal_code,
            country: a.country,
            reference: a.reference,
            is_principal: a.is_principal,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = addresses)]
pub struct NewAddressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub reference: Option<String>,
    pub is_principal: bool,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = addresses)]
#[diesel(treat_none_as_null = true)]
pub struct AddressChangeset {
    pub label: Option<String>,
    pub street: String,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: String,
    pub reference: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ── Payment methods ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = payment_methods)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentMethodRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentMethodRow> for PaymentMethod {
    fn from(m: PaymentMethodRow) -> Self {
        PaymentMethod {
            id: m.id,
            name: m.name,
            description: m.description,
            is_active: m.is_active,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payment_methods)]
pub struct NewPaymentMethodRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = payment_methods)]
pub struct PaymentMethodChangeset {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

// ── Reviews ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = reviews)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReviewRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(r: ReviewRow) -> Self {
        Review {
            id: r.id,
            product_id: r.product_id,
            user_id: r.user_id,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reviews)]
pub struct NewReviewRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = reviews)]
pub struct ReviewChangeset {
    pub rating: Option<i32>,
    pub comment: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

// ── Tables ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = dining_tables)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DiningTableRow {
    pub id: Uuid,
    pub number: i32,
    pub capacity: i32,
    pub state: String,
    pub current_order_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DiningTableRow> for DiningTable {
    type Error = DomainError;

    fn try_from(t: DiningTableRow) -> Result<Self, Self::Error> {
        Ok(DiningTable {
            id: t.id,
            number: t.number,
            capacity: t.capacity,
            state: t.state.parse()?,
            current_order_id: t.current_order_id,
            updated_at: t.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = dining_tables)]
pub struct NewDiningTableRow {
    pub id: Uuid,
    pub number: i32,
    pub capacity: i32,
    pub state: String,
}
