use std::sync::Arc;
use std::time::Duration;

use crate::application::catalog_service::CatalogService;
use crate::application::checkout_service::CheckoutService;
use crate::application::content_service::ContentService;
use crate::application::order_service::OrderService;
use crate::domain::ports::{
    Clock, ContentRepository, OrderRepository, PaymentGateway, ProductRepository,
};
use crate::infrastructure::uploads::ImageStore;

const DEFAULT_TRACKING_REFRESH: Duration = Duration::from_secs(60);

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub catalog: CatalogService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub content: ContentService,
    pub images: ImageStore,
    pub admin_token: String,
    /// Period of the status re-derivation behind tracking streams.
    pub tracking_refresh: Duration,
}

pub struct Adapters {
    pub products: Arc<dyn ProductRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(adapters: Adapters, images: ImageStore, admin_token: String) -> Self {
        let Adapters {
            products,
            orders,
            content,
            gateway,
            clock,
        } = adapters;
        Self {
            catalog: CatalogService::new(products.clone()),
            checkout: CheckoutService::new(
                products,
                orders.clone(),
                content.clone(),
                gateway.clone(),
                clock.clone(),
            ),
            orders: OrderService::new(orders, gateway, clock.clone()),
            content: ContentService::new(content, clock),
            images,
            admin_token,
            tracking_refresh: DEFAULT_TRACKING_REFRESH,
        }
    }

    pub fn with_tracking_refresh(mut self, period: Duration) -> Self {
        self.tracking_refresh = period;
        self
    }
}
