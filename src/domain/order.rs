use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::checkout::{CustomerInfo, ShippingAddress};
use super::errors::DomainError;
use super::tracking::{tracking_status, TrackingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Approved,
    Rejected,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Pending orders settle once; only approved orders can be refunded.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Pending) | (Pending, Approved) | (Pending, Rejected) | (Approved, Refunded)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            "rejected" => Ok(OrderStatus::Rejected),
            "refunded" => Ok(OrderStatus::Refunded),
            other => Err(DomainError::Internal(format!("unknown order status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CreditCard,
    Pix,
    Boleto,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Boleto => "boleto",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "pix" => Ok(PaymentMethod::Pix),
            "boleto" => Ok(PaymentMethod::Boleto),
            other => Err(DomainError::InvalidInput(format!(
                "unsupported payment method '{other}'"
            ))),
        }
    }
}

/// Line item as it was when the order was placed.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total: BigDecimal,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub coupon_code: Option<String>,
    pub customer: CustomerInfo,
    pub shipping_address: ShippingAddress,
    pub shipped_at: Option<DateTime<Utc>>,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub total: BigDecimal,
    pub payment_method: PaymentMethod,
    pub payment_id: Option<String>,
    pub coupon_code: Option<String>,
    pub customer: CustomerInfo,
    pub shipping_address: ShippingAddress,
    pub shipped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    pub fn tracking_status(&self, now: DateTime<Utc>) -> TrackingStatus {
        tracking_status(self.shipped_at, now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub order_id: Uuid,
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Set when the change also marks the order as shipped.
    pub shipped_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Rows to skip for a 1-based `page`; pages past `i64` rows are invalid.
pub fn page_offset(page: i64, limit: i64) -> Result<i64, DomainError> {
    page.checked_sub(1)
        .and_then(|skipped| skipped.checked_mul(limit))
        .filter(|offset| *offset >= 0)
        .ok_or_else(|| DomainError::InvalidInput(format!("page {page} is out of range")))
}
