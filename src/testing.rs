//! In-memory adapters for unit and handler tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::catalog::{Product, ProductInput, ProductQuery};
use crate::domain::content::{
    Banner, BannerInput, Coupon, CouponInput, Promotion, PromotionInput, SiteSetting,
};
use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, NewOrder, Order, OrderStatus, PaymentMethod, StatusChange};
use crate::domain::payment::{PaymentReceipt, PaymentRequest, PaymentStatus};
use crate::domain::ports::{
    Clock, ContentRepository, OrderRepository, PaymentGateway, ProductRepository,
};

// ── Clock ──────────────────────────────────────────────────────────

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Mutex::new(at))
    }

    pub fn at_epoch() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

// ── Payment gateway ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Approve,
    Pending,
    Reject,
    Fail,
}

pub struct StubGateway {
    mode: Mutex<GatewayMode>,
    calls: AtomicUsize,
    last_request: Mutex<Option<PaymentRequest>>,
    remote_status: Mutex<PaymentStatus>,
    status_lookups: AtomicUsize,
    refunds: Mutex<Vec<String>>,
}

impl StubGateway {
    pub fn new(mode: GatewayMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            remote_status: Mutex::new(PaymentStatus::Approved),
            status_lookups: AtomicUsize::new(0),
            refunds: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: GatewayMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Status reported by `payment_status`, as a webhook lookup would see it.
    pub fn set_remote_status(&self, status: PaymentStatus) {
        *self.remote_status.lock().unwrap() = status;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<PaymentRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn status_lookups(&self) -> usize {
        self.status_lookups.load(Ordering::SeqCst)
    }

    pub fn refunds(&self) -> Vec<String> {
        self.refunds.lock().unwrap().clone()
    }

    fn mode(&self) -> GatewayMode {
        *self.mode.lock().unwrap()
    }

    fn outage() -> DomainError {
        DomainError::Gateway("connection refused".to_string())
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, DomainError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap() = Some(request.clone());

        let mut receipt = PaymentReceipt {
            payment_id: format!("{}", 5_000_000 + n),
            status: PaymentStatus::Approved,
            status_detail: None,
            qr_code: None,
            boleto_url: None,
        };
        match self.mode() {
            GatewayMode::Approve => {}
            GatewayMode::Pending => {
                receipt.status = PaymentStatus::Pending;
                match request.method {
                    PaymentMethod::Pix => receipt.qr_code = Some("00020126-pix".to_string()),
                    PaymentMethod::Boleto => {
                        receipt.boleto_url = Some(format!("https://boleto.test/{n}"))
                    }
                    PaymentMethod::CreditCard => {}
                }
            }
            GatewayMode::Reject => {
                receipt.status = PaymentStatus::Rejected;
                receipt.status_detail = Some("cc_rejected_insufficient_amount".to_string());
            }
            GatewayMode::Fail => return Err(Self::outage()),
        }
        Ok(receipt)
    }

    async fn payment_status(&self, _payment_id: &str) -> Result<PaymentStatus, DomainError> {
        self.status_lookups.fetch_add(1, Ordering::SeqCst);
        if self.mode() == GatewayMode::Fail {
            return Err(Self::outage());
        }
        Ok(*self.remote_status.lock().unwrap())
    }

    async fn refund(&self, payment_id: &str) -> Result<(), DomainError> {
        if self.mode() == GatewayMode::Fail {
            return Err(Self::outage());
        }
        self.refunds.lock().unwrap().push(payment_id.to_string());
        Ok(())
    }
}

// ── Products ───────────────────────────────────────────────────────

pub struct InMemoryProductRepository {
    products: Mutex<Vec<Product>>,
    next_id: AtomicI32,
}

impl InMemoryProductRepository {
    pub fn with_products(products: Vec<Product>) -> Self {
        let next = products.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        Self {
            products: Mutex::new(products),
            next_id: AtomicI32::new(next),
        }
    }

    fn build(id: i32, input: ProductInput) -> Product {
        Product {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            product_type: input.product_type,
            metal: input.metal,
            stone: input.stone,
            discount_percent: input.discount_percent,
            image_urls: input.image_urls,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl ProductRepository for InMemoryProductRepository {
    fn list(&self, query: &ProductQuery) -> Result<Vec<Product>, DomainError> {
        Ok(query.apply(self.products.lock().unwrap().clone()))
    }

    fn find_by_id(&self, id: i32) -> Result<Option<Product>, DomainError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    fn find_many(&self, ids: &[i32]) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    fn create(&self, input: ProductInput) -> Result<Product, DomainError> {
        let product = Self::build(self.next_id.fetch_add(1, Ordering::SeqCst), input);
        self.products.lock().unwrap().push(product.clone());
        Ok(product)
    }

    fn update(&self, id: i32, input: ProductInput) -> Result<Option<Product>, DomainError> {
        let mut products = self.products.lock().unwrap();
        Ok(products.iter_mut().find(|p| p.id == id).map(|p| {
            let created_at = p.created_at;
            *p = Self::build(id, input);
            p.created_at = created_at;
            p.clone()
        }))
    }

    fn delete(&self, id: i32) -> Result<bool, DomainError> {
        let mut products = self.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }
}

// ── Orders ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<Uuid, Order>>,
    events: Mutex<Vec<(Uuid, String)>>,
}

impl InMemoryOrderRepository {
    /// Outbox events written so far, as (order id, event type).
    pub fn events(&self) -> Vec<(Uuid, String)> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let mut orders = self.orders.lock().unwrap();
        if orders.contains_key(&order.id) {
            return Err(DomainError::Conflict(format!("order {} exists", order.id)));
        }
        let now = Utc::now();
        let id = order.id;
        orders.insert(
            id,
            Order {
                id,
                status: order.status,
                total: order.total,
                payment_method: order.payment_method,
                payment_id: order.payment_id,
                coupon_code: order.coupon_code,
                customer: order.customer,
                shipping_address: order.shipping_address,
                shipped_at: order.shipped_at,
                created_at: now,
                updated_at: now,
                lines: order.lines,
            },
        );
        self.events
            .lock()
            .unwrap()
            .push((id, "OrderPlaced".to_string()));
        Ok(id)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .find(|o| o.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut all: Vec<Order> = self.orders.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(usize::try_from(crate::domain::order::page_offset(page, limit)?).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();
        Ok(ListResult { items, total })
    }

    fn update_status(&self, change: &StatusChange) -> Result<(), DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders.get_mut(&change.order_id).ok_or(DomainError::NotFound)?;
        if order.status != change.from {
            return Err(DomainError::Conflict(format!(
                "order {} is {}",
                order.id,
                order.status.as_str()
            )));
        }
        order.status = change.to;
        if change.shipped_at.is_some() {
            order.shipped_at = change.shipped_at;
        }
        order.updated_at = Utc::now();
        self.events
            .lock()
            .unwrap()
            .push((order.id, "OrderStatusChanged".to_string()));
        Ok(())
    }
}

/// Builds a stored order directly, bypassing checkout.
pub fn seeded_order(status: OrderStatus, shipped_at: Option<DateTime<Utc>>) -> NewOrder {
    use crate::domain::checkout::{CustomerInfo, ShippingAddress};
    use crate::domain::order::OrderLine;
    use bigdecimal::BigDecimal;

    NewOrder {
        id: Uuid::new_v4(),
        status,
        total: BigDecimal::from(300),
        payment_method: PaymentMethod::Pix,
        payment_id: Some((Uuid::new_v4().as_u128() % 1_000_000_000_000).to_string()),
        coupon_code: None,
        customer: CustomerInfo {
            name: "Ana Souza".into(),
            email: "ana@example.com".into(),
            phone: "21988887777".into(),
            cpf: "98765432100".into(),
        },
        shipping_address: ShippingAddress {
            postal_code: "20040-002".into(),
            street: "Rua da Assembleia".into(),
            number: "10".into(),
            complement: None,
            neighborhood: "Centro".into(),
            city: "Rio de Janeiro".into(),
            state: "RJ".into(),
        },
        shipped_at,
        lines: vec![OrderLine {
            product_id: 1,
            product_name: "Anel Solitário".into(),
            quantity: 1,
            unit_price: BigDecimal::from(300),
        }],
    }
}

// ── Store content ──────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryContentRepository {
    banners: Mutex<Vec<Banner>>,
    promotions: Mutex<Vec<Promotion>>,
    coupons: Mutex<Vec<Coupon>>,
    settings: Mutex<BTreeMap<String, SiteSetting>>,
    next_id: AtomicI32,
}

impl InMemoryContentRepository {
    fn next_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn remove_by_id<T>(items: &Mutex<Vec<T>>, id: impl Fn(&T) -> bool) -> bool {
    let mut items = items.lock().unwrap();
    let before = items.len();
    items.retain(|i| !id(i));
    items.len() != before
}

impl ContentRepository for InMemoryContentRepository {
    fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>, DomainError> {
        let mut banners: Vec<Banner> = self
            .banners
            .lock()
            .unwrap()
            .iter()
            .filter(|b| !active_only || b.active)
            .cloned()
            .collect();
        banners.sort_by_key(|b| (b.position, b.id));
        Ok(banners)
    }

    fn create_banner(&self, input: BannerInput) -> Result<Banner, DomainError> {
        let banner = Banner {
            id: self.next_id(),
            title: input.title,
            image_url: input.image_url,
            link_url: input.link_url,
            position: input.position,
            active: input.active,
            created_at: Utc::now(),
        };
        self.banners.lock().unwrap().push(banner.clone());
        Ok(banner)
    }

    fn update_banner(&self, id: i32, input: BannerInput) -> Result<Option<Banner>, DomainError> {
        let mut banners = self.banners.lock().unwrap();
        Ok(banners.iter_mut().find(|b| b.id == id).map(|b| {
            b.title = input.title;
            b.image_url = input.image_url;
            b.link_url = input.link_url;
            b.position = input.position;
            b.active = input.active;
            b.clone()
        }))
    }

    fn delete_banner(&self, id: i32) -> Result<bool, DomainError> {
        Ok(remove_by_id(&self.banners, |b| b.id == id))
    }

    fn list_promotions(&self) -> Result<Vec<Promotion>, DomainError> {
        Ok(self.promotions.lock().unwrap().clone())
    }

    fn create_promotion(&self, input: PromotionInput) -> Result<Promotion, DomainError> {
        let promotion = Promotion {
            id: self.next_id(),
            title: input.title,
            description: input.description,
            discount_percent: input.discount_percent,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            active: input.active,
            created_at: Utc::now(),
        };
        self.promotions.lock().unwrap().push(promotion.clone());
        Ok(promotion)
    }

    fn update_promotion(
        &self,
        id: i32,
        input: PromotionInput,
    ) -> Result<Option<Promotion>, DomainError> {
        let mut promotions = self.promotions.lock().unwrap();
        Ok(promotions.iter_mut().find(|p| p.id == id).map(|p| {
            p.title = input.title;
            p.description = input.description;
            p.discount_percent = input.discount_percent;
            p.starts_at = input.starts_at;
            p.ends_at = input.ends_at;
            p.active = input.active;
            p.clone()
        }))
    }

    fn delete_promotion(&self, id: i32) -> Result<bool, DomainError> {
        Ok(remove_by_id(&self.promotions, |p| p.id == id))
    }

    fn list_coupons(&self) -> Result<Vec<Coupon>, DomainError> {
        Ok(self.coupons.lock().unwrap().clone())
    }

    fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        Ok(self
            .coupons
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.code == code)
            .cloned())
    }

    fn create_coupon(&self, input: CouponInput) -> Result<Coupon, DomainError> {
        let mut coupons = self.coupons.lock().unwrap();
        if coupons.iter().any(|c| c.code == input.code) {
            return Err(DomainError::Conflict(format!(
                "coupon {} already exists",
                input.code
            )));
        }
        let coupon = Coupon {
            id: self.next_id(),
            code: input.code,
            discount_percent: input.discount_percent,
            active: input.active,
            expires_at: input.expires_at,
            created_at: Utc::now(),
        };
        coupons.push(coupon.clone());
        Ok(coupon)
    }

    fn update_coupon(&self, id: i32, input: CouponInput) -> Result<Option<Coupon>, DomainError> {
        let mut coupons = self.coupons.lock().unwrap();
        if coupons.iter().any(|c| c.code == input.code && c.id != id) {
            return Err(DomainError::Conflict(format!(
                "coupon {} already exists",
                input.code
            )));
        }
        Ok(coupons.iter_mut().find(|c| c.id == id).map(|c| {
            c.code = input.code;
            c.discount_percent = input.discount_percent;
            c.active = input.active;
            c.expires_at = input.expires_at;
            c.clone()
        }))
    }

    fn delete_coupon(&self, id: i32) -> Result<bool, DomainError> {
        Ok(remove_by_id(&self.coupons, |c| c.id == id))
    }

    fn list_settings(&self) -> Result<Vec<SiteSetting>, DomainError> {
        Ok(self.settings.lock().unwrap().values().cloned().collect())
    }

    fn upsert_setting(&self, key: &str, value: &str) -> Result<SiteSetting, DomainError> {
        let setting = SiteSetting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        self.settings
            .lock()
            .unwrap()
            .insert(key.to_string(), setting.clone());
        Ok(setting)
    }

    fn delete_setting(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.settings.lock().unwrap().remove(key).is_some())
    }
}

// ── HTTP ───────────────────────────────────────────────────────────

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Application state wired to the in-memory adapters above.
pub struct TestContext {
    pub state: actix_web::web::Data<crate::state::AppState>,
    pub products: Arc<InMemoryProductRepository>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub content: Arc<InMemoryContentRepository>,
    pub gateway: Arc<StubGateway>,
    pub clock: Arc<FixedClock>,
    pub upload_dir: tempfile::TempDir,
}

impl TestContext {
    pub fn new(products: Vec<Product>) -> Self {
        use crate::infrastructure::uploads::ImageStore;
        use crate::state::{Adapters, AppState};

        let products = Arc::new(InMemoryProductRepository::with_products(products));
        let orders = Arc::new(InMemoryOrderRepository::default());
        let content = Arc::new(InMemoryContentRepository::default());
        let gateway = Arc::new(StubGateway::new(GatewayMode::Approve));
        let clock = Arc::new(FixedClock::at_epoch());
        let upload_dir = tempfile::tempdir().unwrap();

        let state = AppState::new(
            Adapters {
                products: products.clone(),
                orders: orders.clone(),
                content: content.clone(),
                gateway: gateway.clone(),
                clock: clock.clone(),
            },
            ImageStore::new(upload_dir.path(), 64 * 1024),
            ADMIN_TOKEN.to_string(),
        )
        .with_tracking_refresh(std::time::Duration::from_millis(10));
        Self {
            state: actix_web::web::Data::new(state),
            products,
            orders,
            content,
            gateway,
            clock,
            upload_dir,
        }
    }

    pub fn admin_header() -> (actix_web::http::header::HeaderName, String) {
        (
            actix_web::http::header::AUTHORIZATION,
            format!("Bearer {ADMIN_TOKEN}"),
        )
    }
}
