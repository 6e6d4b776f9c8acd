use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::orders::{AddressDto, CustomerDto};
use crate::application::checkout_service::{CheckoutItem, CheckoutSubmission};
use crate::domain::checkout::CustomerInfo;
use crate::domain::errors::DomainError;
use crate::domain::money::parse_money;
use crate::domain::order::PaymentMethod;
use crate::domain::payment::CardPayment;
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemRequest {
    pub product_id: i32,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardRequest {
    /// Card token produced by the gateway's browser SDK.
    pub token: String,
    /// Card brand as reported by the SDK, e.g. "visa".
    pub payment_method_id: String,
    #[serde(default)]
    pub installments: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    /// Total shown to the shopper; must match the server-side total.
    #[schema(value_type = f64)]
    pub amount: serde_json::Number,
    /// Payer e-mail, used when `customerData.email` is blank.
    #[serde(default)]
    pub email: Option<String>,
    /// Payer name, used when `customerData.name` is blank.
    #[serde(default)]
    pub name: Option<String>,
    /// One of "credit_card", "pix" or "boleto"; credit card when absent.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub customer_data: CustomerDto,
    pub address: AddressDto,
    pub items: Vec<CheckoutItemRequest>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub card: Option<CardRequest>,
}

impl TryFrom<CreatePaymentRequest> for CheckoutSubmission {
    type Error = DomainError;

    fn try_from(r: CreatePaymentRequest) -> Result<Self, Self::Error> {
        let mut customer = CustomerInfo::from(r.customer_data);
        if customer.name.trim().is_empty() {
            customer.name = r.name.unwrap_or_default();
        }
        if customer.email.trim().is_empty() {
            customer.email = r.email.unwrap_or_default();
        }

        Ok(CheckoutSubmission {
            declared_amount: parse_money("amount", &r.amount.to_string())?,
            customer,
            address: r.address.into(),
            payment_method: match r.payment_method.as_deref().map(str::trim) {
                None | Some("") => PaymentMethod::CreditCard,
                Some(method) => method.parse::<PaymentMethod>()?,
            },
            card: r.card.map(|c| CardPayment {
                token: c.token,
                payment_method_id: c.payment_method_id,
                installments: c.installments.unwrap_or(1),
            }),
            coupon_code: r.coupon_code,
            items: r
                .items
                .into_iter()
                .map(|i| CheckoutItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub success: bool,
    pub order_id: Uuid,
    /// approved or pending
    pub payment_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Pix copy-and-paste code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boleto_url: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookData {
    #[schema(value_type = String)]
    pub id: serde_json::Value,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WebhookNotification {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /api/payment/create
///
/// Re-prices the submitted items, charges them through the payment gateway
/// and records the order when the charge is approved or pending. Rejected
/// charges answer 402 and store nothing.
#[utoipa::path(
    post,
    path = "/api/payment/create",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Order placed", body = CreatePaymentResponse),
        (status = 400, description = "Invalid checkout data or amount mismatch"),
        (status = 402, description = "Payment rejected by the gateway"),
        (status = 502, description = "Payment gateway unavailable"),
    ),
    tag = "checkout"
)]
pub async fn create_payment(
    state: web::Data<AppState>,
    body: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let submission = CheckoutSubmission::try_from(body.into_inner())?;
    let outcome = state.checkout.place_order(submission).await?;

    Ok(HttpResponse::Created().json(CreatePaymentResponse {
        success: true,
        order_id: outcome.order_id,
        payment_status: outcome.receipt.status.as_str().to_string(),
        payment_id: Some(outcome.receipt.payment_id),
        qr_code: outcome.receipt.qr_code,
        boleto_url: outcome.receipt.boleto_url,
    }))
}

/// Gateway payment ids are decimal numbers; anything else never reaches the
/// gateway's URL.
fn gateway_payment_id(id: &serde_json::Value) -> Result<String, AppError> {
    let candidate = match id {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    };
    if candidate.is_empty() || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest(format!("invalid payment id {id}")));
    }
    Ok(candidate)
}

/// POST /api/payment/webhook
///
/// Gateway notification. Only `payment` notifications are acted on: the
/// payment's status is fetched from the gateway and applied to its order.
/// Notifications for unknown payments or stale transitions are acknowledged
/// so the gateway stops retrying them.
#[utoipa::path(
    post,
    path = "/api/payment/webhook",
    request_body = WebhookNotification,
    responses(
        (status = 200, description = "Notification processed or ignored"),
        (status = 502, description = "Payment gateway unavailable, retry later"),
    ),
    tag = "checkout"
)]
pub async fn payment_webhook(
    state: web::Data<AppState>,
    body: web::Json<WebhookNotification>,
) -> Result<HttpResponse, AppError> {
    let notification = body.into_inner();
    if notification.kind != "payment" {
        return Ok(HttpResponse::Ok().json(json!({ "ignored": notification.kind })));
    }
    let payment_id = gateway_payment_id(&notification.data.id)?;

    match state.orders.sync_payment(&payment_id).await {
        Ok(order) => Ok(HttpResponse::Ok().json(json!({
            "orderId": order.id,
            "status": order.status.as_str(),
        }))),
        Err(DomainError::NotFound) => {
            log::warn!("Webhook for unknown payment {payment_id}");
            Ok(HttpResponse::Ok().json(json!({ "ignored": payment_id })))
        }
        Err(DomainError::Conflict(msg)) => {
            log::warn!("Webhook for payment {payment_id} ignored: {msg}");
            Ok(HttpResponse::Ok().json(json!({ "ignored": payment_id })))
        }
        Err(e) => Err(e.into()),
    }
}
