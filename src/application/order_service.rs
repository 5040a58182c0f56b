use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::money::validate_quantity;
use crate::domain::optional_text;
use crate::domain::order::{
    Order, OrderDraft, OrderFilter, OrderItem, OrderLineDraft, OrderStatus, OrderStatusInfo,
    StatusChange,
};
use crate::domain::ports::{
    AddressRepository, CartRepository, OrderRepository, PaymentMethodRepository,
    ProductRepository, TableRepository,
};
use crate::domain::{Page, PageRequest};

/// Who is acting on an order.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutInput {
    pub address_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PosLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default)]
pub struct PosOrderInput {
    pub table_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub notes: Option<String>,
    pub items: Vec<PosLine>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    addresses: Arc<dyn AddressRepository>,
    payment_methods: Arc<dyn PaymentMethodRepository>,
    tables: Arc<dyn TableRepository>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        carts: Arc<dyn CartRepository>,
        products: Arc<dyn ProductRepository>,
        addresses: Arc<dyn AddressRepository>,
        payment_methods: Arc<dyn PaymentMethodRepository>,
        tables: Arc<dyn TableRepository>,
    ) -> Self {
        Self {
            orders,
            carts,
            products,
            addresses,
            payment_methods,
            tables,
        }
    }

    /// Turns the caller's cart into a `PENDING` order and empties the cart.
    /// The lines are taken from the cart under its lock, so items added or
    /// removed concurrently are either fully in the order or left in the cart.
    pub fn checkout(&self, user_id: Uuid, input: CheckoutInput) -> Result<Order, DomainError> {
        let cart = self.carts.get_or_create(user_id)?;
        if cart.is_empty() {
            return Err(DomainError::invalid("cart is empty"));
        }
        if let Some(address_id) = input.address_id {
            self.addresses
                .find(user_id, address_id)?
                .ok_or(DomainError::NotFound("Address"))?;
        }
        if let Some(method_id) = input.payment_method_id {
            self.ensure_payment_method(method_id)?;
        }

        let draft = OrderDraft {
            user_id,
            table_id: None,
            address_id: input.address_id,
            payment_method_id: input.payment_method_id,
            notes: optional_text("notes", input.notes, 1000)?,
            lines: Vec::new(),
        };
        let order_id = self.orders.create_from_cart(cart.id, draft)?;
        log::info!("user {} checked out cart {} as order {}", user_id, cart.id, order_id);
        self.load(order_id)
    }

    /// Rings up an order at the point of sale, optionally seating it at a table.
    pub fn create_pos_order(
        &self,
        staff_id: Uuid,
        input: PosOrderInput,
    ) -> Result<Order, DomainError> {
        if input.items.is_empty() {
            return Err(DomainError::invalid("an order needs at least one item"));
        }
        if let Some(table_id) = input.table_id {
            let table = self
                .tables
                .find_by_id(table_id)?
                .ok_or(DomainError::NotFound("Table"))?;
            if !table.state.can_seat() {
                return Err(DomainError::conflict(format!(
                    "table {} is {}",
                    table.number, table.state
                )));
            }
        }
        if let Some(method_id) = input.payment_method_id {
            self.ensure_payment_method(method_id)?;
        }

        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            lines.push(self.priced_line(item.product_id, item.quantity)?);
        }

        let draft = OrderDraft {
            user_id: staff_id,
            table_id: input.table_id,
            address_id: None,
            payment_method_id: input.payment_method_id,
            notes: optional_text("notes", input.notes, 1000)?,
            lines: OrderDraft::merge_duplicate_lines(lines)?,
        };
        let order_id = self.orders.create(draft)?;
        log::info!("POS order {} opened by {}", order_id, staff_id);
        self.load(order_id)
    }

    pub fn list(
        &self,
        actor: Actor,
        mut filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Page<Order>, DomainError> {
        if !actor.is_staff {
            filter.user_id = Some(actor.user_id);
            filter.table_id = None;
        }
        self.orders.list(filter, page)
    }

    pub fn get(&self, actor: Actor, id: Uuid) -> Result<Order, DomainError> {
        let order = self.load(id)?;
        if actor.is_staff || order.user_id == actor.user_id {
            Ok(order)
        } else {
            Err(DomainError::NotFound("Order"))
        }
    }

    pub fn items(&self, actor: Actor, id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        Ok(self.get(actor, id)?.items)
    }

    pub fn history(&self, actor: Actor, id: Uuid) -> Result<Vec<StatusChange>, DomainError> {
        self.get(actor, id)?;
        self.orders.history(id)
    }

    pub fn change_status(
        &self,
        actor: Actor,
        id: Uuid,
        next: OrderStatus,
        note: Option<String>,
    ) -> Result<Order, DomainError> {
        if !actor.is_staff {
            return Err(DomainError::Forbidden(
                "only staff can change order status".into(),
            ));
        }
        let order = self.load(id)?;
        let next = order.status.transition_to(next)?;
        let note = optional_text("note", note, 1000)?;
        self.orders
            .change_status(id, order.status, next, Some(actor.user_id), note)?;
        log::info!("order {} moved {} -> {} by {}", id, order.status, next, actor.user_id);
        self.load(id)
    }

    /// Customers may cancel their own orders while they are still pending.
    pub fn cancel(&self, actor: Actor, id: Uuid) -> Result<Order, DomainError> {
        let order = self.get(actor, id)?;
        if !actor.is_staff && order.status != OrderStatus::Pending {
            return Err(DomainError::conflict(
                "only pending orders can be cancelled",
            ));
        }
        let next = order.status.transition_to(OrderStatus::Cancelled)?;
        self.orders.change_status(
            id,
            order.status,
            next,
            Some(actor.user_id),
            Some("cancelled on request".to_string()),
        )?;
        self.load(id)
    }

    pub fn add_item(
        &self,
        order_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Order, DomainError> {
        let order = self.load(order_id)?;
        ensure_editable(&order)?;
        let line = self.priced_line(product_id, quantity)?;
        self.orders.add_item(order_id, line)
    }

    pub fn remove_item(&self, order_id: Uuid, item_id: Uuid) -> Result<Order, DomainError> {
        let order = self.load(order_id)?;
        ensure_editable(&order)?;
        if !order.items.iter().any(|i| i.id == item_id) {
            return Err(DomainError::NotFound("Order item"));
        }
        self.orders.remove_item(order_id, item_id)
    }

    pub fn statuses(&self) -> Result<Vec<OrderStatusInfo>, DomainError> {
        self.orders.list_statuses()
    }

    fn load(&self, id: Uuid) -> Result<Order, DomainError> {
        self.orders
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Order"))
    }

    fn priced_line(&self, product_id: Uuid, quantity: i32) -> Result<OrderLineDraft, DomainError> {
        validate_quantity(quantity)?;
        let product = self
            .products
            .find_by_id(product_id)?
            .ok_or(DomainError::NotFound("Product"))?;
        if !product.is_sellable() {
            return Err(DomainError::invalid(format!(
                "product '{}' is not available",
                product.name
            )));
        }
        OrderLineDraft::new(product.id, quantity, product.price)
    }

    fn ensure_payment_method(&self, id: Uuid) -> Result<(), DomainError> {
        let method = self
            .payment_methods
            .find_by_id(id)?
            .ok_or(DomainError::NotFound("Payment method"))?;
        if !method.is_active {
            return Err(DomainError::invalid(format!(
                "payment method '{}' is disabled",
                method.name
            )));
        }
        Ok(())
    }
}

fn ensure_editable(order: &Order) -> Result<(), DomainError> {
    if order.status.accepts_item_changes() {
        Ok(())
    } else {
        Err(DomainError::conflict(format!(
            "items of a {} order cannot change",
            order.status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::InMemoryStore;
    use crate::domain::address::AddressInput;
    use crate::domain::catalog::ProductChanges;
    use crate::domain::table::{TableInput, TableState};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn service(store: &Arc<InMemoryStore>) -> OrderService {
        OrderService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        )
    }

    fn customer(id: Uuid) -> Actor {
        Actor {
            user_id: id,
            is_staff: false,
        }
    }

    fn staff() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            is_staff: true,
        }
    }

    fn fill_cart(store: &Arc<InMemoryStore>, user_id: Uuid) {
        let latte = store.seed_product("Latte", "3.00", true);
        let toast = store.seed_product("Tostada", "2.25", true);
        let carts: Arc<dyn CartRepository> = store.clone();
        let cart = carts.get_or_create(user_id).unwrap();
        carts
            .put_line(
                cart.id,
                crate::domain::cart::CartLineWrite::new(latte.id, 2, latte.price).unwrap(),
            )
            .unwrap();
        carts
            .put_line(
                cart.id,
                crate::domain::cart::CartLineWrite::new(toast.id, 1, toast.price).unwrap(),
            )
            .unwrap();
    }

    fn table(store: &Arc<InMemoryStore>, number: i32) -> Uuid {
        let tables: Arc<dyn TableRepository> = store.clone();
        tables
            .create(TableInput {
                number,
                capacity: 4,
            })
            .unwrap()
            .id
    }

    #[test]
    fn checkout_moves_cart_into_pending_order() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let user_id = Uuid::new_v4();
        fill_cart(&store, user_id);

        let order = svc.checkout(user_id, CheckoutInput::default()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total, dec("8.25"));

        let carts: Arc<dyn CartRepository> = store.clone();
        assert!(carts.get_or_create(user_id).unwrap().is_empty());

        let history = svc.history(customer(user_id), order.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[0].to_status, OrderStatus::Pending);
    }

    #[test]
    fn checkout_of_empty_cart_is_rejected() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        assert!(matches!(
            svc.checkout(Uuid::new_v4(), CheckoutInput::default()),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn stale_cart_snapshot_cannot_be_ordered_twice() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let user_id = Uuid::new_v4();
        fill_cart(&store, user_id);
        let carts: Arc<dyn CartRepository> = store.clone();
        let snapshot = carts.get_or_create(user_id).unwrap();

        svc.checkout(user_id, CheckoutInput::default()).unwrap();

        let orders: Arc<dyn OrderRepository> = store.clone();
        let draft = OrderDraft {
            user_id,
            table_id: None,
            address_id: None,
            payment_method_id: None,
            notes: None,
            lines: Vec::new(),
        };
        assert!(matches!(
            orders.create_from_cart(snapshot.id, draft),
            Err(DomainError::InvalidInput(_))
        ));
        let page = svc
            .list(customer(user_id), OrderFilter::default(), PageRequest::default())
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn checkout_refuses_products_withdrawn_from_sale() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let user_id = Uuid::new_v4();
        let retired = store.seed_product("Retired blend", "4.00", true);
        let carts: Arc<dyn CartRepository> = store.clone();
        let cart = carts.get_or_create(user_id).unwrap();
        carts
            .add_to_line(cart.id, retired.id, 1, retired.price.clone())
            .unwrap();
        let products: Arc<dyn ProductRepository> = store.clone();
        products
            .update(
                retired.id,
                ProductChanges {
                    is_active: Some(false),
                    ..ProductChanges::default()
                },
            )
            .unwrap();

        assert!(matches!(
            svc.checkout(user_id, CheckoutInput::default()),
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(carts.get_or_create(user_id).unwrap().items.len(), 1);
    }

    #[test]
    fn checkout_rejects_someone_elses_address() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let user_id = Uuid::new_v4();
        fill_cart(&store, user_id);

        let addresses: Arc<dyn AddressRepository> = store.clone();
        let foreign = addresses
            .create(
                Uuid::new_v4(),
                AddressInput {
                    label: None,
                    street: "Calle 1".into(),
                    city: "Lima".into(),
                    region: None,
                    postal_code: None,
                    country: "PE".into(),
                    reference: None,
                },
            )
            .unwrap();

        let input = CheckoutInput {
            address_id: Some(foreign.id),
            ..CheckoutInput::default()
        };
        assert!(matches!(
            svc.checkout(user_id, input),
            Err(DomainError::NotFound("Address"))
        ));
    }

    #[test]
    fn pos_order_occupies_and_payment_frees_table() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let waiter = staff();
        let table_id = table(&store, 7);
        let espresso = store.seed_product("Espresso", "1.80", true);

        let order = svc
            .create_pos_order(
                waiter.user_id,
                PosOrderInput {
                    table_id: Some(table_id),
                    items: vec![
                        PosLine {
                            product_id: espresso.id,
                            quantity: 1,
                        },
                        PosLine {
                            product_id: espresso.id,
                            quantity: 1,
                        },
                    ],
                    ..PosOrderInput::default()
                },
            )
            .unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total, dec("3.60"));

        let tables: Arc<dyn TableRepository> = store.clone();
        let seated = tables.find_by_id(table_id).unwrap().unwrap();
        assert_eq!(seated.state, TableState::Occupied);
        assert_eq!(seated.current_order_id, Some(order.id));

        let second = svc.create_pos_order(
            waiter.user_id,
            PosOrderInput {
                table_id: Some(table_id),
                items: vec![PosLine {
                    product_id: espresso.id,
                    quantity: 1,
                }],
                ..PosOrderInput::default()
            },
        );
        assert!(matches!(second, Err(DomainError::Conflict(_))));

        for next in [
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
            OrderStatus::Paid,
        ] {
            svc.change_status(waiter, order.id, next, None).unwrap();
        }
        let freed = tables.find_by_id(table_id).unwrap().unwrap();
        assert_eq!(freed.state, TableState::Free);
        assert_eq!(freed.current_order_id, None);
        assert_eq!(svc.history(waiter, order.id).unwrap().len(), 5);
    }

    #[test]
    fn pos_lines_summing_past_i32_max_are_invalid_input() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let water = store.seed_product("Agua", "0.00", true);

        let result = svc.create_pos_order(
            Uuid::new_v4(),
            PosOrderInput {
                items: vec![
                    PosLine {
                        product_id: water.id,
                        quantity: i32::MAX,
                    },
                    PosLine {
                        product_id: water.id,
                        quantity: 1,
                    },
                ],
                ..PosOrderInput::default()
            },
        );
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn invalid_transition_is_a_conflict() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let user_id = Uuid::new_v4();
        fill_cart(&store, user_id);
        let order = svc.checkout(user_id, CheckoutInput::default()).unwrap();

        assert!(matches!(
            svc.change_status(staff(), order.id, OrderStatus::Paid, None),
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            svc.change_status(customer(user_id), order.id, OrderStatus::Preparing, None),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn customers_cancel_only_pending_orders() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let user_id = Uuid::new_v4();
        fill_cart(&store, user_id);
        let order = svc.checkout(user_id, CheckoutInput::default()).unwrap();
        svc.change_status(staff(), order.id, OrderStatus::Preparing, None)
            .unwrap();
        assert!(matches!(
            svc.cancel(customer(user_id), order.id),
            Err(DomainError::Conflict(_))
        ));

        fill_cart(&store, user_id);
        let pending = svc.checkout(user_id, CheckoutInput::default()).unwrap();
        let cancelled = svc.cancel(customer(user_id), pending.id).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
    }

    #[test]
    fn orders_of_others_are_hidden() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let owner = Uuid::new_v4();
        fill_cart(&store, owner);
        let order = svc.checkout(owner, CheckoutInput::default()).unwrap();

        assert!(matches!(
            svc.get(customer(Uuid::new_v4()), order.id),
            Err(DomainError::NotFound("Order"))
        ));
        assert!(svc.get(staff(), order.id).is_ok());

        let mine = svc
            .list(customer(Uuid::new_v4()), OrderFilter::default(), PageRequest::default())
            .unwrap();
        assert_eq!(mine.total, 0);
        let all = svc
            .list(staff(), OrderFilter::default(), PageRequest::default())
            .unwrap();
        assert_eq!(all.total, 1);
    }

    #[test]
    fn item_changes_recompute_total_until_ready() {
        let store = InMemoryStore::new();
        let svc = service(&store);
        let user_id = Uuid::new_v4();
        fill_cart(&store, user_id);
        let order = svc.checkout(user_id, CheckoutInput::default()).unwrap();
        let juice = store.seed_product("Jugo", "4.00", true);

        let order = svc.add_item(order.id, juice.id, 2).unwrap();
        assert_eq!(order.items.len(), 3);
        assert_eq!(order.total, dec("16.25"));

        let juice_line = order
            .items
            .iter()
            .find(|i| i.product_id == juice.id)
            .unwrap()
            .id;
        let order = svc.remove_item(order.id, juice_line).unwrap();
        assert_eq!(order.total, dec("8.25"));

        svc.change_status(staff(), order.id, OrderStatus::Preparing, None)
            .unwrap();
        svc.change_status(staff(), order.id, OrderStatus::Ready, None)
            .unwrap();
        assert!(matches!(
            svc.add_item(order.id, juice.id, 1),
            Err(DomainError::Conflict(_))
        ));
    }
}
