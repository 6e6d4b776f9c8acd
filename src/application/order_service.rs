use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::run_blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, Order, OrderStatus, StatusChange};
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{Clock, OrderRepository, PaymentGateway};
use crate::domain::tracking::{milestones, Milestone, TrackingStatus};

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct TrackingView {
    pub order_id: Uuid,
    pub order_status: OrderStatus,
    pub status: TrackingStatus,
    pub shipped_at: Option<DateTime<Utc>>,
    pub milestones: Vec<Milestone>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orders,
            gateway,
            clock,
        }
    }

    pub fn get_order(&self, id: Uuid) -> Result<Order, DomainError> {
        self.orders.find_by_id(id)?.ok_or(DomainError::NotFound)
    }

    pub fn list_orders(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        self.orders
            .list(page.max(1), limit.clamp(1, MAX_PAGE_SIZE))
    }

    pub fn tracking(&self, id: Uuid) -> Result<TrackingView, DomainError> {
        let order = self.get_order(id)?;
        let now = self.clock.now();
        Ok(TrackingView {
            order_id: order.id,
            order_status: order.status,
            status: order.tracking_status(now),
            shipped_at: order.shipped_at,
            milestones: order
                .shipped_at
                .map(|shipped_at| milestones(shipped_at, now))
                .unwrap_or_default(),
        })
    }

    /// Records a status reported by the gateway for `payment_id`.
    ///
    /// Re-delivery of the current status is accepted and changes nothing.
    pub fn apply_payment_status(
        &self,
        payment_id: &str,
        status: PaymentStatus,
    ) -> Result<Order, DomainError> {
        let order = self
            .orders
            .find_by_payment_id(payment_id)?
            .ok_or(DomainError::NotFound)?;
        let next = status.order_status();
        if next == order.status {
            return Ok(order);
        }
        self.transition(order, next)
    }

    /// Looks up the payment's current status at the gateway and applies it.
    pub async fn sync_payment(&self, payment_id: &str) -> Result<Order, DomainError> {
        let status = self.gateway.payment_status(payment_id).await?;
        log::info!("Gateway reports payment {payment_id} as {}", status.as_str());
        let service = self.clone();
        let payment_id = payment_id.to_string();
        run_blocking(move || service.apply_payment_status(&payment_id, status)).await
    }

    pub async fn refund(&self, id: Uuid) -> Result<Order, DomainError> {
        let service = self.clone();
        let order = run_blocking(move || service.get_order(id)).await?;
        if order.status != OrderStatus::Approved {
            return Err(DomainError::Conflict(format!(
                "only approved orders can be refunded, order {id} is {}",
                order.status.as_str()
            )));
        }
        let payment_id = order.payment_id.clone().ok_or_else(|| {
            DomainError::Conflict(format!("order {id} has no payment to refund"))
        })?;

        self.gateway.refund(&payment_id).await?;
        log::info!("Refunded payment {payment_id} of order {id}");

        let service = self.clone();
        run_blocking(move || match service.transition(order, OrderStatus::Refunded) {
            // A refund notification may have been recorded in the meantime.
            Err(DomainError::Conflict(msg)) => {
                let current = service.get_order(id)?;
                if current.status == OrderStatus::Refunded {
                    Ok(current)
                } else {
                    Err(DomainError::Conflict(msg))
                }
            }
            other => other,
        })
        .await
    }

    pub(crate) async fn current_tracking(&self, id: Uuid) -> Result<TrackingStatus, DomainError> {
        let service = self.clone();
        Ok(run_blocking(move || service.tracking(id)).await?.status)
    }

    fn transition(&self, order: Order, next: OrderStatus) -> Result<Order, DomainError> {
        if !order.status.can_transition_to(next) {
            return Err(DomainError::Conflict(format!(
                "order {} cannot move from {} to {}",
                order.id,
                order.status.as_str(),
                next.as_str()
            )));
        }
        let shipped_at = (next == OrderStatus::Approved && order.shipped_at.is_none())
            .then(|| self.clock.now());
        self.orders.update_status(&StatusChange {
            order_id: order.id,
            from: order.status,
            to: next,
            shipped_at,
        })?;
        log::info!(
            "Order {} moved from {} to {}",
            order.id,
            order.status.as_str(),
            next.as_str()
        );
        self.get_order(order.id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::testing::{
        seeded_order, FixedClock, GatewayMode, InMemoryOrderRepository, StubGateway,
    };

    struct Fixture {
        service: OrderService,
        repo: Arc<InMemoryOrderRepository>,
        gateway: Arc<StubGateway>,
        clock: Arc<FixedClock>,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryOrderRepository::default());
        let gateway = Arc::new(StubGateway::new(GatewayMode::Approve));
        let clock = Arc::new(FixedClock::at_epoch());
        Fixture {
            service: OrderService::new(repo.clone(), gateway.clone(), clock.clone()),
            repo,
            gateway,
            clock,
        }
    }

    fn seed(f: &Fixture, status: OrderStatus, shipped: bool) -> Order {
        let shipped_at = shipped.then(|| f.clock.now());
        let id = f.repo.create(seeded_order(status, shipped_at)).unwrap();
        f.repo.find_by_id(id).unwrap().unwrap()
    }

    #[test]
    fn unknown_order_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.get_order(Uuid::new_v4()),
            Err(DomainError::NotFound)
        ));
        assert!(matches!(
            f.service.tracking(Uuid::new_v4()),
            Err(DomainError::NotFound)
        ));
    }

    #[test]
    fn list_clamps_paging() {
        let f = fixture();
        for _ in 0..3 {
            seed(&f, OrderStatus::Pending, false);
        }
        let result = f.service.list_orders(0, 0).unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.items.len(), 1);

        let result = f.service.list_orders(1, 1000).unwrap();
        assert_eq!(result.items.len(), 3);
    }

    #[test]
    fn unshipped_order_tracks_as_pending() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Pending, false);
        let view = f.service.tracking(order.id).unwrap();
        assert_eq!(view.status, TrackingStatus::Pending);
        assert!(view.milestones.is_empty());
    }

    #[test]
    fn tracking_follows_the_clock() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Approved, true);

        f.clock.advance(Duration::days(4));
        let view = f.service.tracking(order.id).unwrap();
        assert_eq!(view.status, TrackingStatus::EmTransito);
        assert_eq!(view.milestones.iter().filter(|m| m.reached).count(), 2);

        f.clock.advance(Duration::days(7));
        assert_eq!(
            f.service.tracking(order.id).unwrap().status,
            TrackingStatus::Entregue
        );
    }

    #[test]
    fn approval_marks_order_shipped() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Pending, false);
        let payment_id = order.payment_id.clone().unwrap();

        let updated = f
            .service
            .apply_payment_status(&payment_id, PaymentStatus::Approved)
            .unwrap();

        assert_eq!(updated.status, OrderStatus::Approved);
        assert_eq!(updated.shipped_at, Some(f.clock.now()));
        assert_eq!(
            f.repo.events().last().map(|(_, t)| t.as_str()),
            Some("OrderStatusChanged")
        );
    }

    #[test]
    fn repeated_status_is_a_no_op() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Approved, true);
        let events = f.repo.events().len();
        f.service
            .apply_payment_status(order.payment_id.as_deref().unwrap(), PaymentStatus::Approved)
            .unwrap();
        assert_eq!(f.repo.events().len(), events);
    }

    #[test]
    fn settled_order_rejects_backwards_transition() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Rejected, false);
        assert!(matches!(
            f.service
                .apply_payment_status(order.payment_id.as_deref().unwrap(), PaymentStatus::Approved),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn unknown_payment_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.service.apply_payment_status("nope", PaymentStatus::Approved),
            Err(DomainError::NotFound)
        ));
    }

    #[tokio::test]
    async fn webhook_sync_reads_status_from_gateway() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Pending, false);
        f.gateway.set_remote_status(PaymentStatus::Rejected);

        let updated = f
            .service
            .sync_payment(order.payment_id.as_deref().unwrap())
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Rejected);
        assert!(updated.shipped_at.is_none());
    }

    #[tokio::test]
    async fn refund_calls_gateway_then_records_refund() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Approved, true);

        let refunded = f.service.refund(order.id).await.unwrap();

        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(f.gateway.refunds(), vec![order.payment_id.unwrap()]);
    }

    /// Gateway whose refund is confirmed by a webhook before the call returns.
    struct NotifyingGateway {
        repo: Arc<InMemoryOrderRepository>,
        order_id: Uuid,
    }

    #[async_trait::async_trait]
    impl PaymentGateway for NotifyingGateway {
        async fn create_payment(
            &self,
            _: &crate::domain::payment::PaymentRequest,
        ) -> Result<crate::domain::payment::PaymentReceipt, DomainError> {
            Err(DomainError::Gateway("not used".into()))
        }

        async fn payment_status(&self, _: &str) -> Result<PaymentStatus, DomainError> {
            Ok(PaymentStatus::Refunded)
        }

        async fn refund(&self, _: &str) -> Result<(), DomainError> {
            self.repo.update_status(&StatusChange {
                order_id: self.order_id,
                from: OrderStatus::Approved,
                to: OrderStatus::Refunded,
                shipped_at: None,
            })
        }
    }

    #[tokio::test]
    async fn refund_recorded_by_webhook_meanwhile_still_succeeds() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Approved, true);
        let service = OrderService::new(
            f.repo.clone(),
            Arc::new(NotifyingGateway {
                repo: f.repo.clone(),
                order_id: order.id,
            }),
            f.clock.clone(),
        );

        let refunded = service.refund(order.id).await.unwrap();
        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(f.repo.events().len(), 2);
    }

    #[tokio::test]
    async fn refund_requires_approved_order() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Pending, false);
        assert!(matches!(
            f.service.refund(order.id).await,
            Err(DomainError::Conflict(_))
        ));
        assert!(f.gateway.refunds().is_empty());
    }

    #[tokio::test]
    async fn failed_gateway_refund_leaves_order_approved() {
        let f = fixture();
        let order = seed(&f, OrderStatus::Approved, true);
        f.gateway.set_mode(GatewayMode::Fail);

        assert!(matches!(
            f.service.refund(order.id).await,
            Err(DomainError::Gateway(_))
        ));
        assert_eq!(
            f.service.get_order(order.id).unwrap().status,
            OrderStatus::Approved
        );
    }
}
