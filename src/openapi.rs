use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{
    addresses, carts, categories, orders, payment_methods, products, reviews, tables, users,
    vendors,
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Cafe API", description = "Shop, point of sale and back office of the cafe"),
    paths(
        users::register,
        users::login,
        users::me,
        users::update_me,
        users::change_password,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::list_roles,
        vendors::list_vendors,
        vendors::get_vendor,
        vendors::create_vendor,
        vendors::update_vendor,
        vendors::delete_vendor,
        categories::list_categories,
        categories::get_category,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        carts::get_cart,
        carts::add_item,
        carts::update_item,
        carts::remove_item,
        carts::clear_cart,
        orders::checkout,
        orders::create_pos_order,
        orders::list_orders,
        orders::get_order,
        orders::change_status,
        orders::cancel_order,
        orders::order_history,
        orders::list_items,
        orders::add_item,
        orders::remove_item,
        orders::list_statuses,
        addresses::list_addresses,
        addresses::get_address,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address,
        addresses::set_principal,
        payment_methods::list_methods,
        payment_methods::get_method,
        payment_methods::create_method,
        payment_methods::update_method,
        payment_methods::delete_method,
        reviews::list_reviews,
        reviews::rating_summary,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        tables::list_tables,
        tables::get_table,
        tables::create_table,
        tables::update_table,
        tables::delete_table,
        tables::change_state,
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
