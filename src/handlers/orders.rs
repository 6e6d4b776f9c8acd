use actix_web::http::header::{CacheControl, CacheDirective};
use actix_web::{web, HttpResponse};
use futures::stream;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::auth::AdminAuth;
use crate::application::order_service::TrackingView;
use crate::application::polling::TrackingWatcher;
use crate::domain::checkout::{CustomerInfo, ShippingAddress};
use crate::domain::order::{Order, OrderLine};
use crate::domain::tracking::TrackingStatus;
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDto {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Brazilian taxpayer id, digits with or without punctuation.
    pub cpf: String,
}

impl From<CustomerDto> for CustomerInfo {
    fn from(c: CustomerDto) -> Self {
        Self {
            name: c.name,
            email: c.email,
            phone: c.phone,
            cpf: c.cpf,
        }
    }
}

impl From<CustomerInfo> for CustomerDto {
    fn from(c: CustomerInfo) -> Self {
        Self {
            name: c.name,
            email: c.email,
            phone: c.phone,
            cpf: c.cpf,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressDto {
    #[serde(alias = "cep")]
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl From<AddressDto> for ShippingAddress {
    fn from(a: AddressDto) -> Self {
        Self {
            postal_code: a.postal_code,
            street: a.street,
            number: a.number,
            complement: a.complement.filter(|c| !c.trim().is_empty()),
            neighborhood: a.neighborhood,
            city: a.city,
            state: a.state,
        }
    }
}

impl From<ShippingAddress> for AddressDto {
    fn from(a: ShippingAddress) -> Self {
        Self {
            postal_code: a.postal_code,
            street: a.street,
            number: a.number,
            complement: a.complement,
            neighborhood: a.neighborhood,
            city: a.city,
            state: a.state,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: String,
}

impl From<OrderLine> for OrderLineResponse {
    fn from(l: OrderLine) -> Self {
        Self {
            product_id: l.product_id,
            product_name: l.product_name,
            quantity: l.quantity,
            unit_price: l.unit_price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub status: String,
    pub total: String,
    pub payment_method: String,
    pub payment_id: Option<String>,
    pub coupon_code: Option<String>,
    pub customer: CustomerDto,
    pub shipping_address: AddressDto,
    pub shipped_at: Option<String>,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            status: o.status.as_str().to_string(),
            total: o.total.to_string(),
            payment_method: o.payment_method.as_str().to_string(),
            payment_id: o.payment_id,
            coupon_code: o.coupon_code,
            customer: o.customer.into(),
            shipping_address: o.shipping_address.into(),
            shipped_at: o.shipped_at.map(|t| t.to_rfc3339()),
            created_at: o.created_at.to_rfc3339(),
            lines: o.lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneResponse {
    pub status: String,
    pub label: String,
    pub starts_at: String,
    pub reached: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResponse {
    pub order_id: Uuid,
    pub order_status: String,
    /// One of pending, embalado, em_transito, fiscalizacao, entregue.
    pub status: String,
    pub label: String,
    pub shipped_at: Option<String>,
    pub milestones: Vec<MilestoneResponse>,
}

impl From<TrackingView> for TrackingResponse {
    fn from(v: TrackingView) -> Self {
        Self {
            order_id: v.order_id,
            order_status: v.order_status.as_str().to_string(),
            status: v.status.as_str().to_string(),
            label: v.status.label().to_string(),
            shipped_at: v.shipped_at.map(|t| t.to_rfc3339()),
            milestones: v
                .milestones
                .into_iter()
                .map(|m| MilestoneResponse {
                    status: m.status.as_str().to_string(),
                    label: m.status.label().to_string(),
                    starts_at: m.starts_at.to_rfc3339(),
                    reached: m.reached,
                })
                .collect(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /api/orders/{id}
///
/// Snapshot of the order as placed, with its current payment status.
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let order = web::block(move || state.orders.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /api/orders/{id}/tracking
///
/// Shipment status derived from the days elapsed since the order shipped.
/// Recomputed on every request.
#[utoipa::path(
    get,
    path = "/api/orders/{id}/tracking",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Tracking status", body = TrackingResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_tracking(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let view = web::block(move || state.orders.tracking(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(HttpResponse::Ok().json(TrackingResponse::from(view)))
}

/// One server-sent event per tracking status change.
fn tracking_event(order_id: Uuid, status: TrackingStatus) -> web::Bytes {
    let data = serde_json::json!({
        "orderId": order_id,
        "status": status.as_str(),
        "label": status.label(),
    });
    web::Bytes::from(format!("event: tracking\ndata: {data}\n\n"))
}

/// GET /api/orders/{id}/tracking/stream
///
/// Server-sent events: the current tracking status first, then every change
/// until the order is delivered. The refresh task stops when the client
/// disconnects.
#[utoipa::path(
    get,
    path = "/api/orders/{id}/tracking/stream",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "text/event-stream of tracking statuses"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn stream_tracking(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let initial = state.orders.current_tracking(order_id).await?;
    let watcher = TrackingWatcher::spawn(
        state.orders.clone(),
        order_id,
        initial,
        state.tracking_refresh,
    );
    let updates = watcher.subscribe();

    // State: (watcher kept alive, receiver, first event sent, stream finished)
    let events = stream::unfold(
        (watcher, updates, false, false),
        move |(watcher, mut updates, started, finished)| async move {
            if finished {
                return None;
            }
            if started {
                updates.changed().await.ok()?;
            }
            let status = *updates.borrow_and_update();
            let done = status == TrackingStatus::Entregue;
            Some((
                Ok::<_, actix_web::Error>(tracking_event(order_id, status)),
                (watcher, updates, true, done),
            ))
        },
    );

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(CacheControl(vec![CacheDirective::NoCache]))
        .streaming(events))
}

/// GET /api/admin/orders
///
/// Paginated list of orders, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 401, description = "Missing or wrong admin token"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn list_orders(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || state.orders.list_orders(page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// POST /api/admin/orders/{id}/refund
///
/// Refunds the payment at the gateway, then marks the order refunded.
#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/refund",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order refunded", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not approved"),
        (status = 502, description = "Payment gateway error"),
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn refund_order(
    _admin: AdminAuth,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = state.orders.refund(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
