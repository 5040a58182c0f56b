pub mod account_service;
pub mod address_service;
pub mod cart_service;
pub mod catalog_service;
pub mod order_service;
pub mod payment_service;
pub mod review_service;
pub mod table_service;
pub mod vendor_service;

#[cfg(test)]
pub(crate) mod fakes;

pub use account_service::AccountService;
pub use address_service::AddressService;
pub use cart_service::CartService;
pub use catalog_service::CatalogService;
pub use order_service::OrderService;
pub use payment_service::PaymentService;
pub use review_service::ReviewService;
pub use table_service::TableService;
pub use vendor_service::VendorService;
