use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::checkout::CustomerInfo;
use super::order::{OrderStatus, PaymentMethod};

/// Card data tokenized client-side by the gateway's SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPayment {
    pub token: String,
    /// Gateway brand identifier, e.g. "visa".
    pub payment_method_id: String,
    pub installments: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentItem {
    pub product_id: i32,
    pub title: String,
    pub quantity: u32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// Sent to the gateway as external reference and idempotency key.
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub description: String,
    pub method: PaymentMethod,
    pub card: Option<CardPayment>,
    pub payer: CustomerInfo,
    pub items: Vec<PaymentItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Approved,
    Pending,
    Rejected,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        self.order_status().as_str()
    }

    pub fn order_status(self) -> OrderStatus {
        match self {
            PaymentStatus::Approved => OrderStatus::Approved,
            PaymentStatus::Pending => OrderStatus::Pending,
            PaymentStatus::Rejected => OrderStatus::Rejected,
            PaymentStatus::Refunded => OrderStatus::Refunded,
        }
    }

    /// Whether the checkout may move on to confirmation.
    pub fn is_accepted(self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub status_detail: Option<String>,
    pub qr_code: Option<String>,
    pub boleto_url: Option<String>,
}
