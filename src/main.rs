use std::io;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use storefront_service::application::polling::{poll_until, PollPolicy};
use storefront_service::config::AppConfig;
use storefront_service::infrastructure::clock::SystemClock;
use storefront_service::infrastructure::content_repo::DieselContentRepository;
use storefront_service::infrastructure::order_repo::DieselOrderRepository;
use storefront_service::infrastructure::payment_gateway::MercadoPagoGateway;
use storefront_service::infrastructure::product_repo::DieselProductRepository;
use storefront_service::infrastructure::uploads::ImageStore;
use storefront_service::{build_server, create_pool, run_migrations, Adapters, AppState};

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(startup_error)?;
    let pool = create_pool(&config.database_url);

    let probe_pool = pool.clone();
    poll_until(
        "database",
        PollPolicy {
            interval: Duration::from_millis(500),
            timeout: config.db_ready_timeout,
        },
        move || {
            let pool = probe_pool.clone();
            async move {
                tokio::task::spawn_blocking(move || pool.get().is_ok())
                    .await
                    .unwrap_or(false)
            }
        },
    )
    .await
    .map_err(startup_error)?;
    run_migrations(&pool).map_err(startup_error)?;

    let gateway = MercadoPagoGateway::new(
        &config.payment_api_url,
        &config.payment_access_token,
        config.payment_timeout,
    )
    .map_err(startup_error)?;

    let state = AppState::new(
        Adapters {
            products: Arc::new(DieselProductRepository::new(pool.clone())),
            orders: Arc::new(DieselOrderRepository::new(pool.clone())),
            content: Arc::new(DieselContentRepository::new(pool)),
            gateway: Arc::new(gateway),
            clock: Arc::new(SystemClock),
        },
        ImageStore::new(&config.upload_dir, config.upload_max_bytes),
        config.admin_token.clone(),
    )
    .with_tracking_refresh(config.tracking_refresh);

    log::info!(
        "Starting server at http://{}:{}",
        config.host,
        config.port
    );

    build_server(state, &config.host, config.port)?.await
}
