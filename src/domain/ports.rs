use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::account::{NewUser, NewVendor, RoleInfo, User, UserChanges, Vendor, VendorChanges};
use super::address::{Address, AddressInput};
use super::cart::{Cart, CartLineWrite};
use super::catalog::{Category, CategoryInput, NewProduct, Product, ProductChanges, ProductFilter};
use super::errors::DomainError;
use super::order::{
    Order, OrderDraft, OrderFilter, OrderLineDraft, OrderStatus, OrderStatusInfo, StatusChange,
};
use super::payment::{NewPaymentMethod, PaymentMethod, PaymentMethodChanges};
use super::review::{NewReview, Review, ReviewChanges};
use super::table::{DiningTable, TableInput, TableState};
use super::{Page, PageRequest};

pub trait UserRepository: Send + Sync + 'static {
    fn create(&self, user: NewUser) -> Result<User, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    fn list(&self, page: PageRequest) -> Result<Page<User>, DomainError>;
    fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DomainError>;
    fn update_password(&self, id: Uuid, password_hash: String) -> Result<bool, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    fn list_roles(&self) -> Result<Vec<RoleInfo>, DomainError>;
}

pub trait VendorRepository: Send + Sync + 'static {
    /// Inserts the vendor profile and promotes its user to the vendor role
    /// in one transaction.
    fn create(&self, vendor: NewVendor) -> Result<Vendor, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Vendor>, DomainError>;
    fn list(&self) -> Result<Vec<Vendor>, DomainError>;
    fn update(&self, id: Uuid, changes: VendorChanges) -> Result<Option<Vendor>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait CategoryRepository: Send + Sync + 'static {
    fn list(&self) -> Result<Vec<Category>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError>;
    fn create(&self, input: CategoryInput) -> Result<Category, DomainError>;
    fn update(&self, id: Uuid, input: CategoryInput) -> Result<Option<Category>, DomainError>;
    /// Fails with `Conflict` while products still reference the category.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait ProductRepository: Send + Sync + 'static {
    fn list(&self, filter: ProductFilter, page: PageRequest) -> Result<Page<Product>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn create(&self, product: NewProduct) -> Result<Product, DomainError>;
    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

/// Every mutation recomputes the cart total inside the same transaction.
pub trait CartRepository: Send + Sync + 'static {
    fn get_or_create(&self, user_id: Uuid) -> Result<Cart, DomainError>;
    /// Inserts the line, or replaces the existing line for the same product.
    fn put_line(&self, cart_id: Uuid, line: CartLineWrite) -> Result<Cart, DomainError>;
    /// Adds `quantity` units to the product's line, reading the current
    /// quantity under the cart lock.
    fn add_to_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: BigDecimal,
    ) -> Result<Cart, DomainError>;
    fn remove_line(&self, cart_id: Uuid, item_id: Uuid) -> Result<Cart, DomainError>;
    fn clear(&self, cart_id: Uuid) -> Result<Cart, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Inserts the order, its lines and the initial history entry. When the
    /// draft names a table, the table is occupied in the same transaction.
    fn create(&self, draft: OrderDraft) -> Result<Uuid, DomainError>;
    /// Locks the cart, builds the draft's lines from its items, inserts the
    /// order and empties the cart, all in one transaction. An empty cart or
    /// an item whose product is no longer sold is `InvalidInput`.
    fn create_from_cart(&self, cart_id: Uuid, draft: OrderDraft) -> Result<Uuid, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>, DomainError>;
    /// Compare-and-set on `from`; reaching a terminal status frees the table.
    fn change_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        changed_by: Option<Uuid>,
        note: Option<String>,
    ) -> Result<(), DomainError>;
    fn add_item(&self, order_id: Uuid, line: OrderLineDraft) -> Result<Order, DomainError>;
    fn remove_item(&self, order_id: Uuid, item_id: Uuid) -> Result<Order, DomainError>;
    fn history(&self, order_id: Uuid) -> Result<Vec<StatusChange>, DomainError>;
    fn list_statuses(&self) -> Result<Vec<OrderStatusInfo>, DomainError>;
}

pub trait AddressRepository: Send + Sync + 'static {
    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Address>, DomainError>;
    fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>, DomainError>;
    /// The first address of a user becomes the principal one.
    fn create(&self, user_id: Uuid, input: AddressInput) -> Result<Address, DomainError>;
    fn update(&self, user_id: Uuid, id: Uuid, input: AddressInput)
        -> Result<Option<Address>, DomainError>;
    /// Removing the principal address promotes the newest remaining one.
    fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, DomainError>;
    fn set_principal(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>, DomainError>;
}

pub trait PaymentMethodRepository: Send + Sync + 'static {
    fn list(&self, include_inactive: bool) -> Result<Vec<PaymentMethod>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentMethod>, DomainError>;
    fn create(&self, method: NewPaymentMethod) -> Result<PaymentMethod, DomainError>;
    fn update(
        &self,
        id: Uuid,
        changes: PaymentMethodChanges,
    ) -> Result<Option<PaymentMethod>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait ReviewRepository: Send + Sync + 'static {
    fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError>;
    fn ratings_for_product(&self, product_id: Uuid) -> Result<Vec<i32>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, DomainError>;
    /// Fails with `Conflict` when the user already reviewed the product.
    fn create(&self, review: NewReview) -> Result<Review, DomainError>;
    fn update(&self, id: Uuid, changes: ReviewChanges) -> Result<Option<Review>, DomainError>;
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}

pub trait TableRepository: Send + Sync + 'static {
    fn list(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<DiningTable>, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<DiningTable>, DomainError>;
    fn create(&self, input: TableInput) -> Result<DiningTable, DomainError>;
    fn update(&self, id: Uuid, input: TableInput) -> Result<Option<DiningTable>, DomainError>;
    /// Fails with `Conflict` while the table is occupied, checked under the
    /// row lock.
    fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    /// Moves the table from `from` to `to`. Returns `None` when the row no
    /// longer matches `from` (or `expected_updated_at`, when given).
    fn set_state(
        &self,
        id: Uuid,
        from: TableState,
        to: TableState,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Option<DiningTable>, DomainError>;
}
