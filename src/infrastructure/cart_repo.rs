use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::dsl::sum;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{Cart, CartItem, CartLineWrite};
use crate::domain::errors::DomainError;
use crate::domain::money;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts, products};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Locks the cart row for the rest of the transaction.
fn lock_cart(conn: &mut PgConnection, cart_id: Uuid) -> Result<CartRow, DomainError> {
    carts::table
        .find(cart_id)
        .select(CartRow::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound("Cart"))
}

fn load_cart(conn: &mut PgConnection, cart: CartRow) -> Result<Cart, DomainError> {
    let items = CartItemRow::belonging_to(&cart)
        .inner_join(products::table)
        .select((CartItemRow::as_select(), products::name))
        .order(cart_items::created_at.asc())
        .load::<(CartItemRow, String)>(conn)?
        .into_iter()
        .map(|(item, product_name)| CartItem {
            id: item.id,
            product_id: item.product_id,
            product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
        })
        .collect();

    Ok(Cart {
        id: cart.id,
        user_id: cart.user_id,
        total: cart.total,
        items,
    })
}

/// Writes `carts.total = Σ subtotal` and returns the refreshed cart.
fn refresh_total(conn: &mut PgConnection, cart_id: Uuid) -> Result<Cart, DomainError> {
    let total: Option<BigDecimal> = cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .select(sum(cart_items::subtotal))
        .first(conn)?;

    let total = money::ensure_storable("cart total", total.unwrap_or_else(|| BigDecimal::from(0)))?;

    let cart = diesel::update(carts::table.find(cart_id))
        .set((
            carts::total.eq(total),
            carts::updated_at.eq(Utc::now()),
        ))
        .returning(CartRow::as_returning())
        .get_result(conn)?;

    load_cart(conn, cart)
}

/// Inserts the line or overwrites the cart's line for the same product.
/// Callers hold the cart lock.
fn upsert_line(conn: &mut PgConnection, cart_id: Uuid, line: CartLineWrite) -> Result<(), DomainError> {
    diesel::insert_into(cart_items::table)
        .values(&NewCartItemRow {
            id: Uuid::new_v4(),
            cart_id,
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal: line.subtotal,
        })
        .on_conflict((cart_items::cart_id, cart_items::product_id))
        .do_update()
        .set((
            cart_items::quantity.eq(excluded(cart_items::quantity)),
            cart_items::unit_price.eq(excluded(cart_items::unit_price)),
            cart_items::subtotal.eq(excluded(cart_items::subtotal)),
        ))
        .execute(conn)?;
    Ok(())
}

impl CartRepository for DieselCartRepository {
    fn get_or_create(&self, user_id: Uuid) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(carts::table)
                .values(&NewCartRow {
                    id: Uuid::new_v4(),
                    user_id,
                })
                .on_conflict(carts::user_id)
                .do_nothing()
                .execute(conn)?;

            let cart = carts::table
                .filter(carts::user_id.eq(user_id))
                .select(CartRow::as_select())
                .first(conn)?;

            load_cart(conn, cart)
        })
    }

    fn put_line(&self, cart_id: Uuid, line: CartLineWrite) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_cart(conn, cart_id)?;
            upsert_line(conn, cart_id, line)?;
            refresh_total(conn, cart_id)
        })
    }

    fn add_to_line(
        &self,
        cart_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        unit_price: BigDecimal,
    ) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_cart(conn, cart_id)?;

            let existing: Option<i32> = cart_items::table
                .filter(cart_items::cart_id.eq(cart_id))
                .filter(cart_items::product_id.eq(product_id))
                .select(cart_items::quantity)
                .first(conn)
                .optional()?;
            let line = CartLineWrite::merged(product_id, existing, quantity, unit_price)?;

            upsert_line(conn, cart_id, line)?;
            refresh_total(conn, cart_id)
        })
    }

    fn remove_line(&self, cart_id: Uuid, item_id: Uuid) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_cart(conn, cart_id)?;

            let deleted = diesel::delete(
                cart_items::table
                    .filter(cart_items::id.eq(item_id))
                    .filter(cart_items::cart_id.eq(cart_id)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(DomainError::NotFound("Cart item"));
            }

            refresh_total(conn, cart_id)
        })
    }

    fn clear(&self, cart_id: Uuid) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_cart(conn, cart_id)?;
            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id)))
                .execute(conn)?;
            refresh_total(conn, cart_id)
        })
    }
}
