use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{page_offset, ListResult, NewOrder, Order, OrderLine, StatusChange};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_lines, order_outbox, orders};

use super::models::{NewOrderLineRow, NewOrderRow, NewOutboxEventRow, OrderLineRow, OrderRow};

fn order_from_rows(row: OrderRow, lines: Vec<OrderLineRow>) -> Result<Order, DomainError> {
    let payment_method = row
        .payment_method
        .parse()
        .map_err(|e: DomainError| DomainError::Internal(e.to_string()))?;
    Ok(Order {
        id: row.id,
        status: row.status.parse()?,
        total: row.total,
        payment_method,
        payment_id: row.payment_id,
        coupon_code: row.coupon_code,
        customer: serde_json::from_value(row.customer)?,
        shipping_address: serde_json::from_value(row.shipping_address)?,
        shipped_at: row.shipped_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        lines: lines
            .into_iter()
            .map(|l| OrderLine {
                product_id: l.product_id,
                product_name: l.product_name,
                quantity: l.quantity,
                unit_price: l.unit_price,
            })
            .collect(),
    })
}

fn outbox_event(order_id: Uuid, event_type: &str, payload: serde_json::Value) -> NewOutboxEventRow {
    NewOutboxEventRow {
        id: Uuid::new_v4(),
        aggregate_type: "Order".to_string(),
        aggregate_id: order_id.to_string(),
        event_type: event_type.to_string(),
        payload,
    }
}

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn load_order(
        conn: &mut PgConnection,
        row: Option<OrderRow>,
    ) -> Result<Option<Order>, DomainError> {
        let Some(row) = row else {
            return Ok(None);
        };

        let lines = order_lines::table
            .filter(order_lines::order_id.eq(row.id))
            .select(OrderLineRow::as_select())
            .order(order_lines::created_at.asc())
            .load(conn)?;

        order_from_rows(row, lines).map(Some)
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: NewOrder) -> Result<Uuid, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order with its customer/address snapshots
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order.id,
                    status: order.status.as_str().to_string(),
                    total: order.total.clone(),
                    payment_method: order.payment_method.as_str().to_string(),
                    payment_id: order.payment_id.clone(),
                    coupon_code: order.coupon_code.clone(),
                    customer: serde_json::to_value(&order.customer)?,
                    shipping_address: serde_json::to_value(&order.shipping_address)?,
                    shipped_at: order.shipped_at,
                })
                .execute(conn)?;

            // 2. Insert the line snapshots
            let new_lines: Vec<NewOrderLineRow> = order
                .lines
                .iter()
                .map(|l| NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    product_id: l.product_id,
                    product_name: l.product_name.clone(),
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .execute(conn)?;

            // 3. Outbox event in the same transaction
            let line_payloads: Vec<serde_json::Value> = order
                .lines
                .iter()
                .map(|l| {
                    json!({
                        "product_id": l.product_id,
                        "product_name": l.product_name,
                        "quantity": l.quantity,
                        "unit_price": l.unit_price.to_string()
                    })
                })
                .collect();

            let payload = json!({
                "order_id": order.id,
                "status": order.status.as_str(),
                "total": order.total.to_string(),
                "payment_method": order.payment_method.as_str(),
                "customer_email": order.customer.email,
                "lines": line_payloads
            });

            diesel::insert_into(order_outbox::table)
                .values(&outbox_event(order.id, "OrderPlaced", payload))
                .execute(conn)?;

            Ok(order.id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        Self::load_order(&mut conn, row)
    }

    fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::payment_id.eq(payment_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        Self::load_order(&mut conn, row)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = page_offset(page, limit)?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            let items = rows
                .into_iter()
                .map(|row| order_from_rows(row, vec![]))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn update_status(&self, change: &StatusChange) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Guarded on the previous status so a concurrent callback cannot
            // be overwritten silently.
            let target = orders::table
                .filter(orders::id.eq(change.order_id))
                .filter(orders::status.eq(change.from.as_str()));

            let updated = match change.shipped_at {
                Some(shipped_at) => diesel::update(target)
                    .set((
                        orders::status.eq(change.to.as_str()),
                        orders::shipped_at.eq(shipped_at),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?,
                None => diesel::update(target)
                    .set((
                        orders::status.eq(change.to.as_str()),
                        orders::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?,
            };

            if updated == 0 {
                let exists: i64 = orders::table
                    .filter(orders::id.eq(change.order_id))
                    .count()
                    .get_result(conn)?;
                return Err(if exists == 0 {
                    DomainError::NotFound
                } else {
                    DomainError::Conflict(format!(
                        "order {} is no longer {}",
                        change.order_id,
                        change.from.as_str()
                    ))
                });
            }

            let payload = json!({
                "order_id": change.order_id,
                "from": change.from.as_str(),
                "to": change.to.as_str(),
                "shipped_at": change.shipped_at,
            });
            diesel::insert_into(order_outbox::table)
                .values(&outbox_event(change.order_id, "OrderStatusChanged", payload))
                .execute(conn)?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::domain::checkout::{CustomerInfo, ShippingAddress};
    use crate::domain::errors::DomainError;
    use crate::domain::order::{NewOrder, OrderLine, OrderStatus, PaymentMethod, StatusChange};
    use crate::domain::ports::OrderRepository;
    use crate::infrastructure::models::OutboxEventRow;
    use crate::infrastructure::test_db::setup_db;
    use crate::schema::order_outbox;

    fn new_order(payment_id: &str) -> NewOrder {
        NewOrder {
            id: Uuid::new_v4(),
            status: OrderStatus::Pending,
            total: BigDecimal::from_str("199.80").expect("valid decimal"),
            payment_method: PaymentMethod::Pix,
            payment_id: Some(payment_id.to_string()),
            coupon_code: None,
            customer: CustomerInfo {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                phone: "11988887777".into(),
                cpf: "98765432100".into(),
            },
            shipping_address: ShippingAddress {
                street: "Rua Augusta".into(),
                number: "42".into(),
                ..ShippingAddress::default()
            },
            shipped_at: None,
            lines: vec![OrderLine {
                product_id: 7,
                product_name: "Brinco Gota".into(),
                quantity: 2,
                unit_price: BigDecimal::from_str("99.90").expect("valid decimal"),
            }],
        }
    }

    #[tokio::test]
    async fn create_and_find_by_id_roundtrip() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        let order_id = repo.create(new_order("pay-1")).expect("create failed");

        let order = repo
            .find_by_id(order_id)
            .expect("find failed")
            .expect("order should exist");

        assert_eq!(order.id, order_id);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.customer.email, "ana@example.com");
        assert_eq!(order.shipping_address.street, "Rua Augusta");
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 2);

        let by_payment = repo
            .find_by_payment_id("pay-1")
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(by_payment.id, order_id);
    }

    #[tokio::test]
    async fn create_and_status_change_write_outbox_events() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());

        let order_id = repo.create(new_order("pay-2")).expect("create failed");
        repo.update_status(&StatusChange {
            order_id,
            from: OrderStatus::Pending,
            to: OrderStatus::Approved,
            shipped_at: Some(Utc::now()),
        })
        .expect("update failed");

        let mut conn = pool.get().expect("Failed to get connection");
        let events: Vec<OutboxEventRow> = order_outbox::table
            .filter(order_outbox::aggregate_id.eq(order_id.to_string()))
            .order(order_outbox::created_at.asc())
            .select(OutboxEventRow::as_select())
            .load(&mut conn)
            .expect("query failed");

        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["OrderPlaced", "OrderStatusChanged"]);

        let order = repo.find_by_id(order_id).unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert!(order.shipped_at.is_some());
    }

    #[tokio::test]
    async fn stale_status_change_is_a_conflict() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);
        let order_id = repo.create(new_order("pay-3")).expect("create failed");

        let result = repo.update_status(&StatusChange {
            order_id,
            from: OrderStatus::Approved,
            to: OrderStatus::Refunded,
            shipped_at: None,
        });
        assert!(matches!(result, Err(DomainError::Conflict(_))));

        let missing = repo.update_status(&StatusChange {
            order_id: Uuid::new_v4(),
            from: OrderStatus::Pending,
            to: OrderStatus::Approved,
            shipped_at: None,
        });
        assert!(matches!(missing, Err(DomainError::NotFound)));
    }

    #[tokio::test]
    async fn list_paginates_correctly() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        for i in 0..5 {
            repo.create(new_order(&format!("pay-list-{i}")))
                .expect("create failed");
        }

        let page1 = repo.list(1, 3).expect("list page 1 failed");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);

        let page2 = repo.list(2, 3).expect("list page 2 failed");
        assert_eq!(page2.total, 5);
        assert_eq!(page2.items.len(), 2);
    }
}
