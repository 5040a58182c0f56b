//! In-memory implementations of every repository port, shared by the service
//! tests. One store backs all ports so cross-table effects (a vendor promoting
//! its user, an order occupying a table, checkout emptying a cart) behave like
//! the Postgres repositories.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::account::{
    NewUser, NewVendor, Role, RoleInfo, User, UserChanges, Vendor, VendorChanges,
};
use crate::domain::address::{Address, AddressInput};
use crate::domain::cart::{Cart, CartItem, CartLineWrite};
use crate::domain::catalog::{
    Category, CategoryInput, NewProduct, Product, ProductChanges, ProductFilter,
};
use crate::domain::errors::DomainError;
use crate::domain::money;
use crate::domain::order::{
    Order, OrderDraft, OrderFilter, OrderItem, OrderLineDraft, OrderStatus, OrderStatusInfo,
    StatusChange,
};
use crate::domain::payment::{NewPaymentMethod, PaymentMethod, PaymentMethodChanges};
use crate::domain::ports::*;
use crate::domain::review::{NewReview, Review, ReviewChanges};
use crate::domain::table::{DiningTable, TableInput, TableState};
use crate::domain::{Page, PageRequest};

#[derive(Default)]
struct State {
    clock: Option<DateTime<Utc>>,
    users: Vec<User>,
    vendors: Vec<Vendor>,
    categories: Vec<Category>,
    products: Vec<Product>,
    carts: Vec<Cart>,
    orders: Vec<Order>,
    history: Vec<StatusChange>,
    addresses: Vec<Address>,
    payment_methods: Vec<PaymentMethod>,
    reviews: Vec<Review>,
    tables: Vec<DiningTable>,
}

impl State {
    /// Strictly increasing timestamps so ordering and polling are deterministic.
    fn tick(&mut self) -> DateTime<Utc> {
        let next = match self.clock {
            Some(last) => (last + Duration::microseconds(1)).max(Utc::now()),
            None => Utc::now(),
        };
        self.clock = Some(next);
        next
    }
}

pub(crate) struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    pub(crate) fn seed_user(&self, email: &str, role: Role) -> User {
        UserRepository::create(
            self,
            NewUser {
                name: "Seeded".into(),
                email: email.into(),
                password_hash: "not-a-real-hash".into(),
                phone: None,
                role,
            },
        )
        .expect("seed user")
    }

    pub(crate) fn user_role(&self, id: Uuid) -> Option<Role> {
        self.state()
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.role)
    }

    pub(crate) fn seed_product(&self, name: &str, price: &str, active: bool) -> Product {
        let category = CategoryRepository::create(
            self,
            CategoryInput {
                name: format!("Category for {name} {}", Uuid::new_v4()),
                description: None,
            },
        )
        .expect("seed category");
        let product = ProductRepository::create(
            self,
            NewProduct {
                category_id: category.id,
                vendor_id: None,
                name: name.into(),
                description: None,
                price: BigDecimal::from_str(price).expect("seed price"),
                stock: 100,
                image_url: None,
            },
        )
        .expect("seed product");
        if active {
            product
        } else {
            ProductRepository::update(
                self,
                product.id,
                ProductChanges {
                    is_active: Some(false),
                    ..ProductChanges::default()
                },
            )
            .expect("deactivate")
            .expect("product exists")
        }
    }
}

fn page_of<T: Clone>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    Page::new(items, total, page)
}

// ── Accounts ─────────────────────────────────────────────────────────────────

impl UserRepository for InMemoryStore {
    fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(DomainError::conflict("email already registered"));
        }
        let created = User {
            id: Uuid::new_v4(),
            role: user.role,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            phone: user.phone,
            is_active: true,
            created_at: state.tick(),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.state().users.iter().find(|u| u.id == id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        Ok(self.state().users.iter().find(|u| u.email == email).cloned())
    }

    fn list(&self, page: PageRequest) -> Result<Page<User>, DomainError> {
        Ok(page_of(self.state().users.clone(), page))
    }

    fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DomainError> {
        let mut state = self.state();
        let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(phone) = changes.phone {
            user.phone = phone;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        Ok(Some(user.clone()))
    }

    fn update_password(&self, id: Uuid, password_hash: String) -> Result<bool, DomainError> {
        let mut state = self.state();
        match state.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        Ok(state.users.len() != before)
    }

    fn list_roles(&self) -> Result<Vec<RoleInfo>, DomainError> {
        Ok([Role::Admin, Role::Vendor, Role::Customer]
            .into_iter()
            .map(|r| RoleInfo {
                id: r.id(),
                name: r.as_str().to_string(),
                description: None,
            })
            .collect())
    }
}

impl VendorRepository for InMemoryStore {
    fn create(&self, vendor: NewVendor) -> Result<Vendor, DomainError> {
        let mut state = self.state();
        if state.vendors.iter().any(|v| v.user_id == vendor.user_id) {
            return Err(DomainError::conflict("user already has a vendor profile"));
        }
        let now = state.tick();
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == vendor.user_id)
            .ok_or(DomainError::NotFound("User"))?;
        if user.role == Role::Customer {
            user.role = Role::Vendor;
        }
        let created = Vendor {
            id: Uuid::new_v4(),
            user_id: vendor.user_id,
            business_name: vendor.business_name,
            description: vendor.description,
            phone: vendor.phone,
            is_active: true,
            created_at: now,
        };
        state.vendors.push(created.clone());
        Ok(created)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Vendor>, DomainError> {
        Ok(self.state().vendors.iter().find(|v| v.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<Vendor>, DomainError> {
        Ok(self.state().vendors.clone())
    }

    fn update(&self, id: Uuid, changes: VendorChanges) -> Result<Option<Vendor>, DomainError> {
        let mut state = self.state();
        let Some(vendor) = state.vendors.iter_mut().find(|v| v.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.business_name {
            vendor.business_name = name;
        }
        if let Some(description) = changes.description {
            vendor.description = description;
        }
        if let Some(phone) = changes.phone {
            vendor.phone = phone;
        }
        if let Some(active) = changes.is_active {
            vendor.is_active = active;
        }
        Ok(Some(vendor.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        let before = state.vendors.len();
        state.vendors.retain(|v| v.id != id);
        Ok(state.vendors.len() != before)
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────────

impl CategoryRepository for InMemoryStore {
    fn list(&self) -> Result<Vec<Category>, DomainError> {
        let mut categories = self.state().categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        Ok(self.state().categories.iter().find(|c| c.id == id).cloned())
    }

    fn create(&self, input: CategoryInput) -> Result<Category, DomainError> {
        let mut state = self.state();
        if state.categories.iter().any(|c| c.name == input.name) {
            return Err(DomainError::conflict("category name already exists"));
        }
        let created = Category {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            created_at: state.tick(),
        };
        state.categories.push(created.clone());
        Ok(created)
    }

    fn update(&self, id: Uuid, input: CategoryInput) -> Result<Option<Category>, DomainError> {
        let mut state = self.state();
        if state
            .categories
            .iter()
            .any(|c| c.name == input.name && c.id != id)
        {
            return Err(DomainError::conflict("category name already exists"));
        }
        let Some(category) = state.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        category.name = input.name;
        category.description = input.description;
        Ok(Some(category.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        if state.products.iter().any(|p| p.category_id == id) {
            return Err(DomainError::conflict("category has associated products"));
        }
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        Ok(state.categories.len() != before)
    }
}

impl ProductRepository for InMemoryStore {
    fn list(&self, filter: ProductFilter, page: PageRequest) -> Result<Page<Product>, DomainError> {
        let needle = filter.search.map(|q| q.to_lowercase());
        let items: Vec<Product> = self
            .state()
            .products
            .iter()
            .filter(|p| filter.include_inactive || p.is_active)
            .filter(|p| filter.category_id.map_or(true, |c| p.category_id == c))
            .filter(|p| filter.vendor_id.map_or(true, |v| p.vendor_id == Some(v)))
            .filter(|p| {
                needle
                    .as_ref()
                    .map_or(true, |q| p.name.to_lowercase().contains(q))
            })
            .cloned()
            .collect();
        Ok(page_of(items, page))
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.state().products.iter().find(|p| p.id == id).cloned())
    }

    fn create(&self, product: NewProduct) -> Result<Product, DomainError> {
        let mut state = self.state();
        let created = Product {
            id: Uuid::new_v4(),
            category_id: product.category_id,
            vendor_id: product.vendor_id,
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            image_url: product.image_url,
            is_active: true,
            created_at: state.tick(),
        };
        state.products.push(created.clone());
        Ok(created)
    }

    fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Option<Product>, DomainError> {
        let mut state = self.state();
        let Some(product) = state.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.category_id {
            product.category_id = v;
        }
        if let Some(v) = changes.vendor_id {
            product.vendor_id = v;
        }
        if let Some(v) = changes.name {
            product.name = v;
        }
        if let Some(v) = changes.description {
            product.description = v;
        }
        if let Some(v) = changes.price {
            product.price = v;
        }
        if let Some(v) = changes.stock {
            product.stock = v;
        }
        if let Some(v) = changes.image_url {
            product.image_url = v;
        }
        if let Some(v) = changes.is_active {
            product.is_active = v;
        }
        Ok(Some(product.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        let before = state.products.len();
        state.products.retain(|p| p.id != id);
        Ok(state.products.len() != before)
    }
}

// ── Carts ────────────────────────────────────────────────────────────────────

fn refresh_total(cart: &mut Cart) {
    cart.total = cart.computed_total();
}

fn write_line(state: &mut State, cart_id: Uuid, line: CartLineWrite) -> Result<Cart, DomainError> {
    let product_name = state
        .products
        .iter()
        .find(|p| p.id == line.product_id)
        .map(|p| p.name.clone())
        .ok_or(DomainError::NotFound("Product"))?;
    let cart = state
        .carts
        .iter_mut()
        .find(|c| c.id == cart_id)
        .ok_or(DomainError::NotFound("Cart"))?;
    match cart
        .items
        .iter_mut()
        .find(|i| i.product_id == line.product_id)
    {
        Some(item) => {
            item.quantity = line.quantity;
            item.unit_price = line.unit_price;
            item.subtotal = line.subtotal;
        }
        None => cart.items.push(CartItem {
            id: Uuid::new_v4(),
            product_id: line.product_id,
            product_name,
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal: line.subtotal,
        }),
    }
    refresh_total(cart);
    Ok(cart.clone())
}

impl CartRepository for InMemoryStore {
    fn get_or_create(&self, user_id: Uuid) -> Result<Cart, DomainError> {
        let mut state = self.state();
        if let Some(cart) = state.carts.iter().find(|c| c.user_id == user_id) {
            return Ok(cart.clone());
        }
        let cart = Cart {
            id: Uuid::new_v4(),
            user_id,
            total: BigDecimal::from(0),
            items: vec![],
        };
        state.carts.push(cart.clone());
        Ok(cart)
    }

    fn put_line(&self, cart_id: Uuid, line: CartLineWrite) -> Result<Cart, DomainError> {
        write_line(&mut self.state(), cart_id, line)
    }

    fn add_to_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: BigDecimal,
    ) -> Result<Cart, DomainError> {
        let mut state = self.state();
        let existing = state
            .carts
            .iter()
            .find(|c| c.id == cart_id)
            .ok_or(DomainError::NotFound("Cart"))?
            .item_for_product(product_id)
            .map(|i| i.quantity);
        let line = CartLineWrite::merged(product_id, existing, quantity, unit_price)?;
        write_line(&mut state, cart_id, line)
    }

    fn remove_line(&self, cart_id: Uuid, item_id: Uuid) -> Result<Cart, DomainError> {
        let mut state = self.state();
        let cart = state
            .carts
            .iter_mut()
            .find(|c| c.id == cart_id)
            .ok_or(DomainError::NotFound("Cart"))?;
        let before = cart.items.len();
        cart.items.retain(|i| i.id != item_id);
        if cart.items.len() == before {
            return Err(DomainError::NotFound("Cart item"));
        }
        refresh_total(cart);
        Ok(cart.clone())
    }

    fn clear(&self, cart_id: Uuid) -> Result<Cart, DomainError> {
        let mut state = self.state();
        let cart = state
            .carts
            .iter_mut()
            .find(|c| c.id == cart_id)
            .ok_or(DomainError::NotFound("Cart"))?;
        cart.items.clear();
        refresh_total(cart);
        Ok(cart.clone())
    }
}

// ── Orders ───────────────────────────────────────────────────────────────────

fn refresh_order_total(order: &mut Order) {
    order.total = money::sum(order.items.iter().map(|i| &i.subtotal));
}

fn free_table_of(state: &mut State, order_id: Uuid, now: DateTime<Utc>) {
    if let Some(table) = state
        .tables
        .iter_mut()
        .find(|t| t.current_order_id == Some(order_id))
    {
        table.state = TableState::Free;
        table.current_order_id = None;
        table.updated_at = now;
    }
}

fn insert_order(state: &mut State, draft: OrderDraft) -> Result<Uuid, DomainError> {
    let now = state.tick();
    let order_id = Uuid::new_v4();
    let total = draft.total()?;

    if let Some(table_id) = draft.table_id {
        let table = state
            .tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or(DomainError::NotFound("Table"))?;
        if !table.state.can_seat() {
            return Err(DomainError::conflict(format!(
                "table {} is {}",
                table.number, table.state
            )));
        }
        table.state = TableState::Occupied;
        table.current_order_id = Some(order_id);
        table.updated_at = now;
    }

    state.orders.push(Order {
        id: order_id,
        user_id: draft.user_id,
        table_id: draft.table_id,
        address_id: draft.address_id,
        payment_method_id: draft.payment_method_id,
        status: OrderStatus::Pending,
        total,
        notes: draft.notes,
        created_at: now,
        updated_at: now,
        items: draft
            .lines
            .into_iter()
            .map(|l| OrderItem {
                id: Uuid::new_v4(),
                product_id: l.product_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                subtotal: l.subtotal,
            })
            .collect(),
    });
    state.history.push(StatusChange {
        id: Uuid::new_v4(),
        order_id,
        from_status: None,
        to_status: OrderStatus::Pending,
        changed_by: Some(draft.user_id),
        note: None,
        created_at: now,
    });
    Ok(order_id)
}

impl OrderRepository for InMemoryStore {
    fn create(&self, draft: OrderDraft) -> Result<Uuid, DomainError> {
        insert_order(&mut self.state(), draft)
    }

    fn create_from_cart(&self, cart_id: Uuid, mut draft: OrderDraft) -> Result<Uuid, DomainError> {
        let mut state = self.state();
        let items = state
            .carts
            .iter()
            .find(|c| c.id == cart_id)
            .ok_or(DomainError::NotFound("Cart"))?
            .items
            .clone();
        if items.is_empty() {
            return Err(DomainError::invalid("cart is empty"));
        }
        draft.lines = Vec::with_capacity(items.len());
        for item in items {
            let sellable = state
                .products
                .iter()
                .any(|p| p.id == item.product_id && p.is_sellable());
            if !sellable {
                return Err(DomainError::invalid(format!(
                    "product '{}' is no longer available",
                    item.product_name
                )));
            }
            draft
                .lines
                .push(OrderLineDraft::new(item.product_id, item.quantity, item.unit_price)?);
        }

        let order_id = insert_order(&mut state, draft)?;
        if let Some(cart) = state.carts.iter_mut().find(|c| c.id == cart_id) {
            cart.items.clear();
            refresh_total(cart);
        }
        Ok(order_id)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.state().orders.iter().find(|o| o.id == id).cloned())
    }

    fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>, DomainError> {
        let mut items: Vec<Order> = self
            .state()
            .orders
            .iter()
            .filter(|o| filter.user_id.map_or(true, |u| o.user_id == u))
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .filter(|o| filter.table_id.map_or(true, |t| o.table_id == Some(t)))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page_of(items, page))
    }

    fn change_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        changed_by: Option<Uuid>,
        note: Option<String>,
    ) -> Result<(), DomainError> {
        let mut state = self.state();
        let now = state.tick();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DomainError::NotFound("Order"))?;
        if order.status != from {
            return Err(DomainError::conflict("order status changed concurrently"));
        }
        order.status = to;
        order.updated_at = now;
        state.history.push(StatusChange {
            id: Uuid::new_v4(),
            order_id: id,
            from_status: Some(from),
            to_status: to,
            changed_by,
            note,
            created_at: now,
        });
        if to.is_terminal() {
            free_table_of(&mut state, id, now);
        }
        Ok(())
    }

    fn add_item(&self, order_id: Uuid, line: OrderLineDraft) -> Result<Order, DomainError> {
        let mut state = self.state();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(DomainError::NotFound("Order"))?;
        if !order.status.accepts_item_changes() {
            return Err(DomainError::conflict("order no longer accepts changes"));
        }
        order.items.push(OrderItem {
            id: Uuid::new_v4(),
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal: line.subtotal,
        });
        refresh_order_total(order);
        Ok(order.clone())
    }

    fn remove_item(&self, order_id: Uuid, item_id: Uuid) -> Result<Order, DomainError> {
        let mut state = self.state();
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(DomainError::NotFound("Order"))?;
        if !order.status.accepts_item_changes() {
            return Err(DomainError::conflict("order no longer accepts changes"));
        }
        let before = order.items.len();
        order.items.retain(|i| i.id != item_id);
        if order.items.len() == before {
            return Err(DomainError::NotFound("Order item"));
        }
        refresh_order_total(order);
        Ok(order.clone())
    }

    fn history(&self, order_id: Uuid) -> Result<Vec<StatusChange>, DomainError> {
        Ok(self
            .state()
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect())
    }

    fn list_statuses(&self) -> Result<Vec<OrderStatusInfo>, DomainError> {
        Ok(OrderStatus::ALL
            .into_iter()
            .enumerate()
            .map(|(i, s)| OrderStatusInfo {
                code: s.code().to_string(),
                label: s.code().to_string(),
                sort_order: i as i32 + 1,
            })
            .collect())
    }
}

// ── Addresses ────────────────────────────────────────────────────────────────

impl AddressRepository for InMemoryStore {
    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Address>, DomainError> {
        Ok(self
            .state()
            .addresses
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>, DomainError> {
        Ok(self
            .state()
            .addresses
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    fn create(&self, user_id: Uuid, input: AddressInput) -> Result<Address, DomainError> {
        let mut state = self.state();
        let first = !state.addresses.iter().any(|a| a.user_id == user_id);
        let created = Address {
            id: Uuid::new_v4(),
            user_id,
            label: input.label,
            street: input.street,
            city: input.city,
            region: input.region,
            postal_code: input.postal_code,
            country: input.country,
            reference: input.reference,
            is_principal: first,
            created_at: state.tick(),
        };
        state.addresses.push(created.clone());
        Ok(created)
    }

    fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: AddressInput,
    ) -> Result<Option<Address>, DomainError> {
        let mut state = self.state();
        let Some(address) = state
            .addresses
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
        else {
            return Ok(None);
        };
        address.label = input.label;
        address.street = input.street;
        address.city = input.city;
        address.region = input.region;
        address.postal_code = input.postal_code;
        address.country = input.country;
        address.reference = input.reference;
        Ok(Some(address.clone()))
    }

    fn delete(&self, user_id: Uuid, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        let Some(pos) = state
            .addresses
            .iter()
            .position(|a| a.id == id && a.user_id == user_id)
        else {
            return Ok(false);
        };
        let removed = state.addresses.remove(pos);
        if removed.is_principal {
            if let Some(next) = state
                .addresses
                .iter_mut()
                .filter(|a| a.user_id == user_id)
                .max_by_key(|a| a.created_at)
            {
                next.is_principal = true;
            }
        }
        Ok(true)
    }

    fn set_principal(&self, user_id: Uuid, id: Uuid) -> Result<Option<Address>, DomainError> {
        let mut state = self.state();
        if !state
            .addresses
            .iter()
            .any(|a| a.id == id && a.user_id == user_id)
        {
            return Ok(None);
        }
        for address in state.addresses.iter_mut().filter(|a| a.user_id == user_id) {
            address.is_principal = address.id == id;
        }
        Ok(state.addresses.iter().find(|a| a.id == id).cloned())
    }
}

// ── Payment methods ──────────────────────────────────────────────────────────

impl PaymentMethodRepository for InMemoryStore {
    fn list(&self, include_inactive: bool) -> Result<Vec<PaymentMethod>, DomainError> {
        Ok(self
            .state()
            .payment_methods
            .iter()
            .filter(|m| include_inactive || m.is_active)
            .cloned()
            .collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentMethod>, DomainError> {
        Ok(self
            .state()
            .payment_methods
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    fn create(&self, method: NewPaymentMethod) -> Result<PaymentMethod, DomainError> {
        let mut state = self.state();
        if state.payment_methods.iter().any(|m| m.name == method.name) {
            return Err(DomainError::conflict("payment method already exists"));
        }
        let created = PaymentMethod {
            id: Uuid::new_v4(),
            name: method.name,
            description: method.description,
            is_active: true,
            created_at: state.tick(),
        };
        state.payment_methods.push(created.clone());
        Ok(created)
    }

    fn update(
        &self,
        id: Uuid,
        changes: PaymentMethodChanges,
    ) -> Result<Option<PaymentMethod>, DomainError> {
        let mut state = self.state();
        let Some(method) = state.payment_methods.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            method.name = name;
        }
        if let Some(description) = changes.description {
            method.description = description;
        }
        if let Some(active) = changes.is_active {
            method.is_active = active;
        }
        Ok(Some(method.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        if state
            .orders
            .iter()
            .any(|o| o.payment_method_id == Some(id))
        {
            return Err(DomainError::conflict("payment method is used by orders"));
        }
        let before = state.payment_methods.len();
        state.payment_methods.retain(|m| m.id != id);
        Ok(state.payment_methods.len() != before)
    }
}

// ── Reviews ──────────────────────────────────────────────────────────────────

impl ReviewRepository for InMemoryStore {
    fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError> {
        let mut reviews: Vec<Review> = self
            .state()
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    fn ratings_for_product(&self, product_id: Uuid) -> Result<Vec<i32>, DomainError> {
        Ok(self
            .state()
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .map(|r| r.rating)
            .collect())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Review>, DomainError> {
        Ok(self.state().reviews.iter().find(|r| r.id == id).cloned())
    }

    fn create(&self, review: NewReview) -> Result<Review, DomainError> {
        let mut state = self.state();
        if state
            .reviews
            .iter()
            .any(|r| r.product_id == review.product_id && r.user_id == review.user_id)
        {
            return Err(DomainError::conflict("product already reviewed by this user"));
        }
        let now = state.tick();
        let created = Review {
            id: Uuid::new_v4(),
            product_id: review.product_id,
            user_id: review.user_id,
            rating: review.rating,
            comment: review.comment,
            created_at: now,
            updated_at: now,
        };
        state.reviews.push(created.clone());
        Ok(created)
    }

    fn update(&self, id: Uuid, changes: ReviewChanges) -> Result<Option<Review>, DomainError> {
        let mut state = self.state();
        let now = state.tick();
        let Some(review) = state.reviews.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if let Some(rating) = changes.rating {
            review.rating = rating;
        }
        if let Some(comment) = changes.comment {
            review.comment = comment;
        }
        review.updated_at = now;
        Ok(Some(review.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        let before = state.reviews.len();
        state.reviews.retain(|r| r.id != id);
        Ok(state.reviews.len() != before)
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

impl TableRepository for InMemoryStore {
    fn list(&self, updated_since: Option<DateTime<Utc>>) -> Result<Vec<DiningTable>, DomainError> {
        let mut tables: Vec<DiningTable> = self
            .state()
            .tables
            .iter()
            .filter(|t| updated_since.map_or(true, |since| t.updated_at > since))
            .cloned()
            .collect();
        tables.sort_by_key(|t| t.number);
        Ok(tables)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<DiningTable>, DomainError> {
        Ok(self.state().tables.iter().find(|t| t.id == id).cloned())
    }

    fn create(&self, input: TableInput) -> Result<DiningTable, DomainError> {
        let mut state = self.state();
        if state.tables.iter().any(|t| t.number == input.number) {
            return Err(DomainError::conflict("table number already exists"));
        }
        let created = DiningTable {
            id: Uuid::new_v4(),
            number: input.number,
            capacity: input.capacity,
            state: TableState::Free,
            current_order_id: None,
            updated_at: state.tick(),
        };
        state.tables.push(created.clone());
        Ok(created)
    }

    fn update(&self, id: Uuid, input: TableInput) -> Result<Option<DiningTable>, DomainError> {
        let mut state = self.state();
        if state
            .tables
            .iter()
            .any(|t| t.number == input.number && t.id != id)
        {
            return Err(DomainError::conflict("table number already exists"));
        }
        let now = state.tick();
        let Some(table) = state.tables.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        table.number = input.number;
        table.capacity = input.capacity;
        table.updated_at = now;
        Ok(Some(table.clone()))
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut state = self.state();
        let Some(pos) = state.tables.iter().position(|t| t.id == id) else {
            return Ok(false);
        };
        if state.tables[pos].state == TableState::Occupied {
            return Err(DomainError::conflict(format!(
                "table {} is occupied",
                state.tables[pos].number
            )));
        }
        state.tables.remove(pos);
        Ok(true)
    }

    fn set_state(
        &self,
        id: Uuid,
        from: TableState,
        to: TableState,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Option<DiningTable>, DomainError> {
        let mut state = self.state();
        let now = state.tick();
        let Some(table) = state.tables.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if table.state != from || expected_updated_at.map_or(false, |e| e != table.updated_at) {
            return Ok(None);
        }
        table.state = to;
        if to == TableState::Free {
            table.current_order_id = None;
        }
        table.updated_at = now;
        Ok(Some(table.clone()))
    }
}
