//! Server side of the checkout: re-prices the submitted cart from the catalog,
//! drives the checkout flow through payment and records the resulting order.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::run_blocking;
use crate::domain::cart::Cart;
use crate::domain::checkout::{AppliedCoupon, CheckoutFlow, CustomerInfo, ShippingAddress};
use crate::domain::content::Coupon;
use crate::domain::errors::DomainError;
use crate::domain::money::round_money;
use crate::domain::order::{NewOrder, OrderLine, OrderStatus, PaymentMethod};
use crate::domain::payment::{CardPayment, PaymentReceipt};
use crate::domain::ports::{
    Clock, ContentRepository, OrderRepository, PaymentGateway, ProductRepository,
};
use crate::infrastructure::cart_storage::MemoryCartStorage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutItem {
    pub product_id: i32,
    pub quantity: u32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSubmission {
    /// Total the shopper saw; must match what the server computes.
    pub declared_amount: BigDecimal,
    pub customer: CustomerInfo,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub card: Option<CardPayment>,
    pub coupon_code: Option<String>,
    pub items: Vec<CheckoutItem>,
}

#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order_id: Uuid,
    pub receipt: PaymentReceipt,
}

#[derive(Clone)]
pub struct CheckoutService {
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    content: Arc<dyn ContentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl CheckoutService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        orders: Arc<dyn OrderRepository>,
        content: Arc<dyn ContentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            products,
            orders,
            content,
            gateway,
            clock,
        }
    }

    pub async fn place_order(
        &self,
        submission: CheckoutSubmission,
    ) -> Result<CheckoutOutcome, DomainError> {
        let mut cart = self.priced_cart(&submission.items).await?;
        let coupon = self.resolve_coupon(submission.coupon_code.as_deref()).await?;

        let mut flow = CheckoutFlow::new();
        flow.set_customer(submission.customer)?;
        flow.advance()?;
        flow.set_address(submission.address)?;
        flow.advance()?;
        flow.set_payment_method(submission.payment_method, submission.card)?;
        flow.apply_coupon(coupon)?;
        flow.advance()?;

        let selected = cart.selected_items();
        let total = flow.amount_due(&selected);
        if round_money(submission.declared_amount.clone()) != total {
            return Err(DomainError::InvalidInput(format!(
                "declared amount {} does not match order total {total}",
                submission.declared_amount
            )));
        }
        let lines = selected
            .iter()
            .map(|item| {
                Ok(OrderLine {
                    product_id: item.product_id,
                    product_name: item.name.clone(),
                    quantity: i32::try_from(item.quantity).map_err(|_| {
                        DomainError::InvalidInput(format!(
                            "quantity of product {} is too large",
                            item.product_id
                        ))
                    })?,
                    unit_price: item.unit_price.clone(),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let order_id = Uuid::new_v4();
        let receipt = match flow.confirm(order_id, &mut cart, self.gateway.as_ref()).await {
            Ok(receipt) => receipt,
            Err(e) => {
                log::warn!("Checkout of order {order_id} was not confirmed: {e}");
                return Err(e);
            }
        };

        let status = receipt.status.order_status();
        let order = NewOrder {
            id: order_id,
            status,
            total,
            payment_method: flow.payment_method(),
            payment_id: Some(receipt.payment_id.clone()),
            coupon_code: flow.coupon().map(|c| c.code.clone()),
            customer: flow.customer().clone(),
            shipping_address: flow.address().clone(),
            shipped_at: (status == OrderStatus::Approved).then(|| self.clock.now()),
            lines,
        };

        let orders = self.orders.clone();
        if let Err(e) = run_blocking(move || orders.create(order)).await {
            log::error!(
                "Payment {} was accepted but order {order_id} could not be stored: {e}",
                receipt.payment_id
            );
            self.reverse_payment(order_id, &receipt.payment_id).await;
            return Err(e);
        }
        log::info!(
            "Order {order_id} placed with payment {} ({})",
            receipt.payment_id,
            status.as_str()
        );

        Ok(CheckoutOutcome { order_id, receipt })
    }

    /// Gives the money back for a charge whose order could not be recorded.
    async fn reverse_payment(&self, order_id: Uuid, payment_id: &str) {
        match self.gateway.refund(payment_id).await {
            Ok(()) => log::warn!("Payment {payment_id} of unrecorded order {order_id} was refunded"),
            Err(e) => log::error!(
                "Payment {payment_id} of unrecorded order {order_id} could not be refunded: {e}"
            ),
        }
    }

    /// Cart of the submitted items at catalog prices, everything selected.
    async fn priced_cart(
        &self,
        items: &[CheckoutItem],
    ) -> Result<Cart<MemoryCartStorage>, DomainError> {
        if items.is_empty() {
            return Err(DomainError::InvalidInput("cart is empty".to_string()));
        }
        if let Some(item) = items.iter().find(|i| i.quantity == 0) {
            return Err(DomainError::InvalidInput(format!(
                "quantity of product {} must be at least 1",
                item.product_id
            )));
        }

        let mut ids: Vec<i32> = items.iter().map(|i| i.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let products = self.products.clone();
        let found = run_blocking(move || products.find_many(&ids)).await?;

        let mut cart = Cart::open(MemoryCartStorage::default())?;
        for item in items {
            let product = found
                .iter()
                .find(|p| p.id == item.product_id)
                .ok_or_else(|| {
                    DomainError::InvalidInput(format!("product {} does not exist", item.product_id))
                })?;
            cart.add_item(product, item.quantity)?;
        }
        Ok(cart)
    }

    async fn resolve_coupon(&self, code: Option<&str>) -> Result<Option<AppliedCoupon>, DomainError> {
        let Some(code) = code.map(Coupon::normalize_code).filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let content = self.content.clone();
        let lookup = code.clone();
        let coupon = run_blocking(move || content.find_coupon_by_code(&lookup)).await?;
        match coupon {
            Some(coupon) if coupon.is_redeemable(self.clock.now()) => Ok(Some(AppliedCoupon {
                code: coupon.code,
                discount_percent: coupon.discount_percent,
            })),
            _ => Err(DomainError::InvalidInput(format!(
                "coupon {code} is invalid or expired"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::catalog::tests::product;
    use crate::domain::catalog::Product;
    use crate::domain::content::CouponInput;
    use crate::domain::order::{ListResult, Order, StatusChange};
    use crate::domain::payment::PaymentStatus;
    use crate::testing::{
        FixedClock, GatewayMode, InMemoryContentRepository, InMemoryOrderRepository,
        InMemoryProductRepository, StubGateway,
    };

    struct Fixture {
        service: CheckoutService,
        orders: Arc<InMemoryOrderRepository>,
        content: Arc<InMemoryContentRepository>,
        gateway: Arc<StubGateway>,
        clock: Arc<FixedClock>,
    }

    fn catalog() -> Vec<Product> {
        let mut discounted = product(2, "200", "colar", "ouro");
        discounted.discount_percent = Some(25);
        vec![product(1, "129.90", "anel", "prata"), discounted]
    }

    fn fixture(mode: GatewayMode) -> Fixture {
        let products = Arc::new(InMemoryProductRepository::with_products(catalog()));
        let orders = Arc::new(InMemoryOrderRepository::default());
        let content = Arc::new(InMemoryContentRepository::default());
        let gateway = Arc::new(StubGateway::new(mode));
        let clock = Arc::new(FixedClock::at_epoch());
        Fixture {
            service: CheckoutService::new(
                products,
                orders.clone(),
                content.clone(),
                gateway.clone(),
                clock.clone(),
            ),
            orders,
            content,
            gateway,
            clock,
        }
    }

    fn submission(amount: &str, method: PaymentMethod) -> CheckoutSubmission {
        CheckoutSubmission {
            declared_amount: BigDecimal::from_str(amount).unwrap(),
            customer: CustomerInfo {
                name: "Carla Mendes".into(),
                email: "carla@example.com".into(),
                phone: "31977776666".into(),
                cpf: "111.444.777-35".into(),
            },
            address: ShippingAddress {
                postal_code: "30130-010".into(),
                street: "Av. Afonso Pena".into(),
                number: "1500".into(),
                complement: Some("apto 12".into()),
                neighborhood: "Centro".into(),
                city: "Belo Horizonte".into(),
                state: "MG".into(),
            },
            payment_method: method,
            card: None,
            coupon_code: None,
            items: vec![
                CheckoutItem {
                    product_id: 1,
                    quantity: 2,
                },
                CheckoutItem {
                    product_id: 2,
                    quantity: 1,
                },
            ],
        }
    }

    struct UnavailableOrderStore;

    impl OrderRepository for UnavailableOrderStore {
        fn create(&self, _: NewOrder) -> Result<Uuid, DomainError> {
            Err(DomainError::Internal("db down".into()))
        }
        fn find_by_id(&self, _: Uuid) -> Result<Option<Order>, DomainError> {
            Ok(None)
        }
        fn find_by_payment_id(&self, _: &str) -> Result<Option<Order>, DomainError> {
            Ok(None)
        }
        fn list(&self, _: i64, _: i64) -> Result<ListResult, DomainError> {
            Ok(ListResult {
                items: vec![],
                total: 0,
            })
        }
        fn update_status(&self, _: &StatusChange) -> Result<(), DomainError> {
            Err(DomainError::Internal("db down".into()))
        }
    }

    // 2 x 129.90 + 150.00 (200 with 25% off)
    const TOTAL: &str = "409.80";

    #[tokio::test]
    async fn approved_checkout_stores_shipped_order() {
        let f = fixture(GatewayMode::Approve);
        let outcome = f
            .service
            .place_order(submission(TOTAL, PaymentMethod::Pix))
            .await
            .unwrap();

        assert_eq!(outcome.receipt.status, PaymentStatus::Approved);
        let order = f.orders.find_by_id(outcome.order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(order.total, BigDecimal::from_str(TOTAL).unwrap());
        assert_eq!(order.shipped_at, Some(f.clock.now()));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.payment_id.as_deref(), Some(outcome.receipt.payment_id.as_str()));
        assert_eq!(f.orders.events(), vec![(outcome.order_id, "OrderPlaced".to_string())]);

        let charged = f.gateway.last_request().unwrap();
        assert_eq!(charged.order_id, outcome.order_id);
        assert_eq!(charged.amount, order.total);
    }

    #[tokio::test]
    async fn pending_pix_returns_qr_code_and_stays_unshipped() {
        let f = fixture(GatewayMode::Pending);
        let outcome = f
            .service
            .place_order(submission(TOTAL, PaymentMethod::Pix))
            .await
            .unwrap();

        assert!(outcome.receipt.qr_code.is_some());
        let order = f.orders.find_by_id(outcome.order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.shipped_at.is_none());
    }

    #[tokio::test]
    async fn rejected_payment_persists_nothing() {
        let f = fixture(GatewayMode::Reject);
        let result = f
            .service
            .place_order(submission(TOTAL, PaymentMethod::Boleto))
            .await;

        assert!(matches!(result, Err(DomainError::PaymentRejected(_))));
        assert_eq!(f.orders.count(), 0);
        assert!(f.orders.events().is_empty());
    }

    #[tokio::test]
    async fn declared_amount_must_match_catalog_prices() {
        let f = fixture(GatewayMode::Approve);
        let result = f
            .service
            .place_order(submission("1.00", PaymentMethod::Pix))
            .await;

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
        assert_eq!(f.gateway.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_product_is_rejected_before_payment() {
        let f = fixture(GatewayMode::Approve);
        let mut sub = submission(TOTAL, PaymentMethod::Pix);
        sub.items.push(CheckoutItem {
            product_id: 42,
            quantity: 1,
        });

        assert!(matches!(
            f.service.place_order(sub).await,
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(f.gateway.calls(), 0);
    }

    #[tokio::test]
    async fn coupon_discount_is_applied_and_recorded() {
        let f = fixture(GatewayMode::Approve);
        f.content
            .create_coupon(CouponInput {
                code: "DEZ".into(),
                discount_percent: 10,
                active: true,
                expires_at: None,
            })
            .unwrap();
        let mut sub = submission("368.82", PaymentMethod::Pix);
        sub.coupon_code = Some("dez".into());

        let outcome = f.service.place_order(sub).await.unwrap();
        let order = f.orders.find_by_id(outcome.order_id).unwrap().unwrap();
        assert_eq!(order.coupon_code.as_deref(), Some("DEZ"));
        assert_eq!(order.total, BigDecimal::from_str("368.82").unwrap());
    }

    #[tokio::test]
    async fn unknown_coupon_is_rejected() {
        let f = fixture(GatewayMode::Approve);
        let mut sub = submission(TOTAL, PaymentMethod::Pix);
        sub.coupon_code = Some("NOPE".into());

        assert!(matches!(
            f.service.place_order(sub).await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn incomplete_customer_stops_before_payment() {
        let f = fixture(GatewayMode::Approve);
        let mut sub = submission(TOTAL, PaymentMethod::Pix);
        sub.customer.cpf.clear();

        assert!(matches!(
            f.service.place_order(sub).await,
            Err(DomainError::InvalidInput(_))
        ));
        assert_eq!(f.gateway.calls(), 0);
    }

    #[tokio::test]
    async fn charge_is_refunded_when_order_cannot_be_stored() {
        let f = fixture(GatewayMode::Approve);
        let service = CheckoutService::new(
            Arc::new(InMemoryProductRepository::with_products(catalog())),
            Arc::new(UnavailableOrderStore),
            f.content.clone(),
            f.gateway.clone(),
            f.clock.clone(),
        );

        let result = service
            .place_order(submission(TOTAL, PaymentMethod::Pix))
            .await;

        assert!(matches!(result, Err(DomainError::Internal(_))));
        assert_eq!(f.gateway.calls(), 1);
        assert_eq!(f.gateway.refunds(), vec!["5000001".to_string()]);
    }

    #[tokio::test]
    async fn gateway_outage_is_reported() {
        let f = fixture(GatewayMode::Fail);
        assert!(matches!(
            f.service
                .place_order(submission(TOTAL, PaymentMethod::Pix))
                .await,
            Err(DomainError::Gateway(_))
        ));
        assert_eq!(f.orders.count(), 0);
    }
}
