use std::sync::Arc;
use uuid::Uuid;

use crate::domain::cart::{Cart, CartLineWrite};
use crate::domain::errors::DomainError;
use crate::domain::money::validate_quantity;
use crate::domain::ports::{CartRepository, ProductRepository};

#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { carts, products }
    }

    pub fn get(&self, user_id: Uuid) -> Result<Cart, DomainError> {
        self.carts.get_or_create(user_id)
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    /// The line is re-priced at the product's current price.
    pub fn add_item(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Cart, DomainError> {
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

        let cart = self.carts.get_or_create(user_id)?;
        self.carts
            .add_to_line(cart.id, product_id, quantity, product.price)
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn update_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<Cart, DomainError> {
        if quantity < 0 {
            return Err(DomainError::invalid("quantity must not be negative"));
        }
        let cart = self.carts.get_or_create(user_id)?;
        let item = cart
            .item(item_id)
            .ok_or(DomainError::NotFound("Cart item"))?;

        if quantity == 0 {
            return self.carts.remove_line(cart.id, item_id);
        }
        let line = CartLineWrite::new(item.product_id, quantity, item.unit_price.clone())?;
        self.carts.put_line(cart.id, line)
    }

    pub fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Cart, DomainError> {
        let cart = self.carts.get_or_create(user_id)?;
        if cart.item(item_id).is_none() {
            return Err(DomainError::NotFound("Cart item"));
        }
        self.carts.remove_line(cart.id, item_id)
    }

    pub fn clear(&self, user_id: Uuid) -> Result<Cart, DomainError> {
        let cart = self.carts.get_or_create(user_id)?;
        self.carts.clear(cart.id)
    }
}
