use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::dsl::sum;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::money;
use crate::domain::order::{
    Order, OrderDraft, OrderFilter, OrderItem, OrderLineDraft, OrderStatus, OrderStatusInfo,
    StatusChange,
};
use crate::domain::ports::OrderRepository;
use crate::domain::table::{DiningTable, TableState};
use crate::domain::{Page, PageRequest};
use crate::schema::{
    cart_items, carts, dining_tables, order_items, order_status_history, order_statuses, orders,
    products,
};

use super::models::{
    CartItemRow, DiningTableRow, NewOrderItemRow, NewOrderRow, NewStatusHistoryRow, OrderItemRow,
    OrderRow, OrderStatusRow, StatusHistoryRow,
};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_order(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, DomainError> {
    Ok(Order {
        id: row.id,
        user_id: row.user_id,
        table_id: row.table_id,
        address_id: row.address_id,
        payment_method_id: row.payment_method_id,
        status: row.status.parse()?,
        total: row.total,
        notes: row.notes,
        created_at: row.created_at,
        updated_at: row.updated_at,
        items: items.into_iter().map(OrderItem::from).collect(),
    })
}

fn load_order(conn: &mut PgConnection, row: OrderRow) -> Result<Order, DomainError> {
    let items = OrderItemRow::belonging_to(&row)
        .select(OrderItemRow::as_select())
        .order(order_items::created_at.asc())
        .load(conn)?;
    to_order(row, items)
}

/// Locks the order row for the rest of the transaction.
fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<OrderRow, DomainError> {
    orders::table
        .find(order_id)
        .select(OrderRow::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound("Order"))
}

fn ensure_editable(row: &OrderRow) -> Result<(), DomainError> {
    let status: OrderStatus = row.status.parse()?;
    if status.accepts_item_changes() {
        Ok(())
    } else {
        Err(DomainError::conflict("order no longer accepts changes"))
    }
}

/// Writes `orders.total = Σ subtotal` and returns the refreshed order.
fn refresh_total(conn: &mut PgConnection, order_id: Uuid) -> Result<Order, DomainError> {
    let total: Option<BigDecimal> = order_items::table
        .filter(order_items::order_id.eq(order_id))
        .select(sum(order_items::subtotal))
        .first(conn)?;

    let total = money::ensure_storable("order total", total.unwrap_or_else(|| BigDecimal::from(0)))?;

    let row = diesel::update(orders::table.find(order_id))
        .set((
            orders::total.eq(total),
            orders::updated_at.eq(Utc::now()),
        ))
        .returning(OrderRow::as_returning())
        .get_result(conn)?;

    load_order(conn, row)
}

fn filtered(filter: &OrderFilter) -> orders::BoxedQuery<'static, Pg> {
    let mut query = orders::table.into_boxed();
    if let Some(user_id) = filter.user_id {
        query = query.filter(orders::user_id.eq(user_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(orders::status.eq(status.code()));
    }
    if let Some(table_id) = filter.table_id {
        query = query.filter(orders::table_id.eq(table_id));
    }
    query
}

/// Inserts the order, its lines and the first history entry, occupying the
/// draft's table. Runs inside the caller's transaction.
fn insert_order(conn: &mut PgConnection, draft: &OrderDraft) -> Result<Uuid, DomainError> {
    let order_id = Uuid::new_v4();
    let total = draft.total()?;

    // 1. Lock the table, if any, before the order exists.
    if let Some(table_id) = draft.table_id {
        let table: DiningTable = dining_tables::table
            .find(table_id)
            .select(DiningTableRow::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or(DomainError::NotFound("Table"))?
            .try_into()?;
        if !table.state.can_seat() {
            return Err(DomainError::conflict(format!(
                "table {} is {}",
                table.number, table.state
            )));
        }
    }

    // 2. Insert the order and its lines
    diesel::insert_into(orders::table)
        .values(&NewOrderRow {
            id: order_id,
            user_id: draft.user_id,
            table_id: draft.table_id,
            address_id: draft.address_id,
            payment_method_id: draft.payment_method_id,
            status: OrderStatus::Pending.code().to_string(),
            total,
            notes: draft.notes.clone(),
        })
        .execute(conn)?;

    let new_items: Vec<NewOrderItemRow> = draft
        .lines
        .iter()
        .map(|l| NewOrderItemRow {
            id: Uuid::new_v4(),
            order_id,
            product_id: l.product_id,
            quantity: l.quantity,
            unit_price: l.unit_price.clone(),
            subtotal: l.subtotal.clone(),
        })
        .collect();
    diesel::insert_into(order_items::table)
        .values(&new_items)
        .execute(conn)?;

    // 3. Initial history entry
    diesel::insert_into(order_status_history::table)
        .values(&NewStatusHistoryRow {
            id: Uuid::new_v4(),
            order_id,
            from_status: None,
            to_status: OrderStatus::Pending.code().to_string(),
            changed_by: Some(draft.user_id),
            note: None,
        })
        .execute(conn)?;

    // 4. Occupy the table
    if let Some(table_id) = draft.table_id {
        diesel::update(dining_tables::table.find(table_id))
            .set((
                dining_tables::state.eq(TableState::Occupied.code()),
                dining_tables::current_order_id.eq(Some(order_id)),
                dining_tables::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
    }

    Ok(order_id)
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, draft: OrderDraft) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| insert_order(conn, &draft))
    }

    fn create_from_cart(&self, cart_id: Uuid, mut draft: OrderDraft) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Concurrent checkouts and cart edits queue behind this lock.
            carts::table
                .find(cart_id)
                .select(carts::id)
                .for_update()
                .first::<Uuid>(conn)
                .optional()?
                .ok_or(DomainError::NotFound("Cart"))?;

            let items: Vec<(CartItemRow, String, bool)> = cart_items::table
                .inner_join(products::table)
                .filter(cart_items::cart_id.eq(cart_id))
                .select((CartItemRow::as_select(), products::name, products::is_active))
                .order(cart_items::created_at.asc())
                .load(conn)?;
            if items.is_empty() {
                return Err(DomainError::invalid("cart is empty"));
            }

            draft.lines = Vec::with_capacity(items.len());
            for (item, name, is_active) in items {
                if !is_active {
                    return Err(DomainError::invalid(format!(
                        "product '{}' is no longer available",
                        name
                    )));
                }
                draft
                    .lines
                    .push(OrderLineDraft::new(item.product_id, item.quantity, item.unit_price)?);
            }

            let order_id = insert_order(conn, &draft)?;

            // 5. Empty the cart the order came from
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id)))
                .execute(conn)?;
            diesel::update(carts::table.find(cart_id))
                .set((
                    carts::total.eq(BigDecimal::from(0)),
                    carts::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            Ok(order_id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        load_order(&mut conn, order).map(Some)
    }

    fn list(&self, filter: OrderFilter, page: PageRequest) -> Result<Page<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = filtered(&filter).count().get_result(conn)?;

            let rows = filtered(&filter)
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            let items = OrderItemRow::belonging_to(&rows)
                .select(OrderItemRow::as_select())
                .order(order_items::created_at.asc())
                .load(conn)?
                .grouped_by(&rows);

            let orders = rows
                .into_iter()
                .zip(items)
                .map(|(row, items)| to_order(row, items))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page::new(orders, total, page))
        })
    }

    fn change_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        changed_by: Option<Uuid>,
        note: Option<String>,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let now = Utc::now();

            // Compare-and-set: only moves the order if nobody else did first.
            let updated = diesel::update(
                orders::table
                    .find(id)
                    .filter(orders::status.eq(from.code())),
            )
            .set((orders::status.eq(to.code()), orders::updated_at.eq(now)))
            .execute(conn)?;

            if updated == 0 {
                let exists: i64 = orders::table.find(id).count().get_result(conn)?;
                return Err(if exists == 0 {
                    DomainError::NotFound("Order")
                } else {
                    DomainError::conflict("order status changed concurrently")
                });
            }

            diesel::insert_into(order_status_history::table)
                .values(&NewStatusHistoryRow {
                    id: Uuid::new_v4(),
                    order_id: id,
                    from_status: Some(from.code().to_string()),
                    to_status: to.code().to_string(),
                    changed_by,
                    note,
                })
                .execute(conn)?;

            if to.is_terminal() {
                let freed = diesel::update(
                    dining_tables::table.filter(dining_tables::current_order_id.eq(id)),
                )
                .set((
                    dining_tables::state.eq(TableState::Free.code()),
                    dining_tables::current_order_id.eq(None::<Uuid>),
                    dining_tables::updated_at.eq(now),
                ))
                .execute(conn)?;
                if freed > 0 {
                    log::info!("table released by order {} ({})", id, to);
                }
            }

            Ok(())
        })
    }

    fn add_item(&self, order_id: Uuid, line: OrderLineDraft) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, order_id)?;
            ensure_editable(&order)?;

            diesel::insert_into(order_items::table)
                .values(&NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    subtotal: line.subtotal,
                })
                .execute(conn)?;

            refresh_total(conn, order_id)
        })
    }

    fn remove_item(&self, order_id: Uuid, item_id: Uuid) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, order_id)?;
            ensure_editable(&order)?;

            let deleted = diesel::delete(
                order_items::table
                    .filter(order_items::id.eq(item_id))
                    .filter(order_items::order_id.eq(order_id)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(DomainError::NotFound("Order item"));
            }

            refresh_total(conn, order_id)
        })
    }

    fn history(&self, order_id: Uuid) -> Result<Vec<StatusChange>, DomainError> {
        let mut conn = self.pool.get()?;

        order_status_history::table
            .filter(order_status_history::order_id.eq(order_id))
            .select(StatusHistoryRow::as_select())
            .order(order_status_history::created_at.asc())
            .load(&mut conn)?
            .into_iter()
            .map(StatusChange::try_from)
            .collect()
    }

    fn list_statuses(&self) -> Result<Vec<OrderStatusInfo>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(order_statuses::table
            .select(OrderStatusRow::as_select())
            .order(order_statuses::sort_order.asc())
            .load(&mut conn)?
            .into_iter()
            .map(OrderStatusInfo::from)
            .collect())
    }
}
