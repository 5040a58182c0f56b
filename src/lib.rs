pub mod application;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{
    AccountService, AddressService, CartService, CatalogService, OrderService, PaymentService,
    ReviewService, TableService, VendorService,
};
use auth::{JwtKeys, PasswordHasher};
use infrastructure::account_repo::{DieselUserRepository, DieselVendorRepository};
use infrastructure::address_repo::DieselAddressRepository;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::catalog_repo::{DieselCategoryRepository, DieselProductRepository};
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::payment_repo::DieselPaymentMethodRepository;
use infrastructure::review_repo::DieselReviewRepository;
use infrastructure::table_repo::DieselTableRepository;

pub use config::Config;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("{} pending migration(s) applied", applied.len());
    Ok(())
}

/// Application services wired to their Diesel repositories, ready to be
/// shared by every worker.
#[derive(Clone)]
pub struct Services {
    pub accounts: web::Data<AccountService>,
    pub vendors: web::Data<VendorService>,
    pub catalog: web::Data<CatalogService>,
    pub carts: web::Data<CartService>,
    pub orders: web::Data<OrderService>,
    pub addresses: web::Data<AddressService>,
    pub payments: web::Data<PaymentService>,
    pub reviews: web::Data<ReviewService>,
    pub tables: web::Data<TableService>,
    pub keys: web::Data<JwtKeys>,
}

impl Services {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        let keys = JwtKeys::new(
            &config.jwt_secret,
            chrono::Duration::hours(config.jwt_ttl_hours),
        );
        let hasher = PasswordHasher::new(config.bcrypt_cost);

        let users = Arc::new(DieselUserRepository::new(pool.clone()));
        let vendors = Arc::new(DieselVendorRepository::new(pool.clone()));
        let categories = Arc::new(DieselCategoryRepository::new(pool.clone()));
        let products = Arc::new(DieselProductRepository::new(pool.clone()));
        let carts = Arc::new(DieselCartRepository::new(pool.clone()));
        let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
        let addresses = Arc::new(DieselAddressRepository::new(pool.clone()));
        let payments = Arc::new(DieselPaymentMethodRepository::new(pool.clone()));
        let reviews = Arc::new(DieselReviewRepository::new(pool.clone()));
        let tables = Arc::new(DieselTableRepository::new(pool));

        Self {
            accounts: web::Data::new(AccountService::new(users.clone(), hasher, keys.clone())),
            vendors: web::Data::new(VendorService::new(vendors.clone(), users)),
            catalog: web::Data::new(CatalogService::new(
                categories,
                products.clone(),
                vendors,
            )),
            carts: web::Data::new(CartService::new(carts.clone(), products.clone())),
            orders: web::Data::new(OrderService::new(
                orders,
                carts,
                products.clone(),
                addresses.clone(),
                payments.clone(),
                tables.clone(),
            )),
            addresses: web::Data::new(AddressService::new(addresses)),
            payments: web::Data::new(PaymentService::new(payments)),
            reviews: web::Data::new(ReviewService::new(reviews, products)),
            tables: web::Data::new(TableService::new(tables)),
            keys: web::Data::new(keys),
        }
    }
}

/// Mounts every resource under `/api`.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(handlers::users::configure)
            .configure(handlers::vendors::configure)
            .configure(handlers::categories::configure)
            .configure(handlers::products::configure)
            .configure(handlers::reviews::configure)
            .configure(handlers::carts::configure)
            .configure(handlers::orders::configure)
            .configure(handlers::addresses::configure)
            .configure(handlers::payment_methods::configure)
            .configure(handlers::tables::configure),
    );
}

/// Build and return an actix-web `Server` bound to the configured address.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(pool: DbPool, config: &Config) -> std::io::Result<actix_web::dev::Server> {
    let services = Services::new(pool, config);
    let frontend_url = config.frontend_url.clone();
    let openapi = openapi::ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_method()
            .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .app_data(services.accounts.clone())
            .app_data(services.vendors.clone())
            .app_data(services.catalog.clone())
            .app_data(services.carts.clone())
            .app_data(services.orders.clone())
            .app_data(services.addresses.clone())
            .app_data(services.payments.clone())
            .app_data(services.reviews.clone())
            .app_data(services.tables.clone())
            .app_data(services.keys.clone())
            .app_data(web::JsonConfig::default().error_handler(errors::json_error_handler))
            .app_data(web::PathConfig::default().error_handler(errors::path_error_handler))
            .app_data(web::QueryConfig::default().error_handler(errors::query_error_handler))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(api_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((config.host.clone(), config.port))?
    .run())
}
