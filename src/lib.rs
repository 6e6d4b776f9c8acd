pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};
pub use state::{Adapters, AppState};

use crate::domain::errors::DomainError;
use crate::handlers::{content, orders, payment, products, upload};
use crate::infrastructure::uploads::PUBLIC_PREFIX;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("Failed to run database migrations: {e}")))?;
    for version in applied {
        log::info!("Applied migration {version}");
    }
    Ok(())
}

struct AdminTokenScheme;

impl Modify for AdminTokenScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        payment::create_payment,
        payment::payment_webhook,
        orders::get_order,
        orders::get_tracking,
        orders::stream_tracking,
        orders::list_orders,
        orders::refund_order,
        content::list_banners,
        content::list_promotions,
        content::validate_coupon,
        content::get_settings,
        content::admin_list_banners,
        content::create_banner,
        content::update_banner,
        content::delete_banner,
        content::admin_list_promotions,
        content::create_promotion,
        content::update_promotion,
        content::delete_promotion,
        content::admin_list_coupons,
        content::create_coupon,
        content::update_coupon,
        content::delete_coupon,
        content::admin_list_settings,
        content::put_setting,
        content::delete_setting,
        upload::upload_image,
    ),
    components(schemas(
        products::ProductResponse,
        products::ProductRequest,
        payment::CreatePaymentRequest,
        payment::CreatePaymentResponse,
        payment::WebhookNotification,
        orders::OrderResponse,
        orders::TrackingResponse,
        orders::ListOrdersResponse,
        content::BannerResponse,
        content::PromotionResponse,
        content::CouponResponse,
        content::SettingResponse,
        upload::UploadResponse,
    )),
    modifiers(&AdminTokenScheme),
    tags(
        (name = "catalog", description = "Product catalog"),
        (name = "checkout", description = "Payment and gateway notifications"),
        (name = "orders", description = "Order snapshots and shipment tracking"),
        (name = "content", description = "Banners, promotions, coupons and settings"),
        (name = "admin", description = "Back-office, bearer token required"),
    )
)]
pub struct ApiDoc;

/// Registers every `/api` route. Shared by the server and handler tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(
                web::scope("/admin")
                    .route("/products", web::post().to(products::create_product))
                    .route("/products/{id}", web::put().to(products::update_product))
                    .route("/products/{id}", web::delete().to(products::delete_product))
                    .route("/orders", web::get().to(orders::list_orders))
                    .route("/orders/{id}/refund", web::post().to(orders::refund_order))
                    .route("/banners", web::get().to(content::admin_list_banners))
                    .route("/banners", web::post().to(content::create_banner))
                    .route("/banners/{id}", web::put().to(content::update_banner))
                    .route("/banners/{id}", web::delete().to(content::delete_banner))
                    .route("/promotions", web::get().to(content::admin_list_promotions))
                    .route("/promotions", web::post().to(content::create_promotion))
                    .route("/promotions/{id}", web::put().to(content::update_promotion))
                    .route("/promotions/{id}", web::delete().to(content::delete_promotion))
                    .route("/coupons", web::get().to(content::admin_list_coupons))
                    .route("/coupons", web::post().to(content::create_coupon))
                    .route("/coupons/{id}", web::put().to(content::update_coupon))
                    .route("/coupons/{id}", web::delete().to(content::delete_coupon))
                    .route("/settings", web::get().to(content::admin_list_settings))
                    .route("/settings/{key}", web::put().to(content::put_setting))
                    .route("/settings/{key}", web::delete().to(content::delete_setting)),
            )
            .route("/products", web::get().to(products::list_products))
            .route("/products/{id}", web::get().to(products::get_product))
            .route("/payment/create", web::post().to(payment::create_payment))
            .route("/payment/webhook", web::post().to(payment::payment_webhook))
            .route("/orders/{id}", web::get().to(orders::get_order))
            .route("/orders/{id}/tracking", web::get().to(orders::get_tracking))
            .route(
                "/orders/{id}/tracking/stream",
                web::get().to(orders::stream_tracking),
            )
            .route("/banners", web::get().to(content::list_banners))
            .route("/promotions", web::get().to(content::list_promotions))
            .route("/coupons/{code}", web::get().to(content::validate_coupon))
            .route("/settings", web::get().to(content::get_settings))
            .route("/upload", web::post().to(upload::upload_image)),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let upload_dir = state.images.dir().to_path_buf();
    std::fs::create_dir_all(&upload_dir)?;
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(actix_files::Files::new(PUBLIC_PREFIX, upload_dir.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
