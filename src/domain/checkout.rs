//! Five-step checkout wizard.
//!
//! Steps only move one at a time. Each forward move is guarded by the fields
//! its step collects, and leaving `Review` requires the payment gateway to
//! accept the charge. A rejected or failed charge keeps the flow at `Review`
//! with the error recorded so the shopper can retry or go back.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::{Cart, CartItem, CartStorage};
use super::errors::DomainError;
use super::money::{percent_off, round_money};
use super::order::PaymentMethod;
use super::payment::{CardPayment, PaymentItem, PaymentReceipt, PaymentRequest};
use super::ports::PaymentGateway;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckoutStep {
    #[default]
    CustomerInfo,
    Address,
    PaymentMethod,
    Review,
    Confirmation,
}

impl CheckoutStep {
    fn next(self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::CustomerInfo => Some(CheckoutStep::Address),
            CheckoutStep::Address => Some(CheckoutStep::PaymentMethod),
            CheckoutStep::PaymentMethod => Some(CheckoutStep::Review),
            CheckoutStep::Review => Some(CheckoutStep::Confirmation),
            CheckoutStep::Confirmation => None,
        }
    }

    fn previous(self) -> Option<CheckoutStep> {
        match self {
            CheckoutStep::CustomerInfo | CheckoutStep::Confirmation => None,
            CheckoutStep::Address => Some(CheckoutStep::CustomerInfo),
            CheckoutStep::PaymentMethod => Some(CheckoutStep::Address),
            CheckoutStep::Review => Some(CheckoutStep::PaymentMethod),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        Err(DomainError::missing_field(field))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub cpf: String,
}

impl CustomerInfo {
    pub fn validate(&self) -> Result<(), DomainError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("phone", &self.phone)?;
        require("cpf", &self.cpf)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> Result<(), DomainError> {
        require("street", &self.street)?;
        require("number", &self.number)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount_percent: i32,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutFlow {
    step: CheckoutStep,
    customer: CustomerInfo,
    address: ShippingAddress,
    payment_method: PaymentMethod,
    card: Option<CardPayment>,
    coupon: Option<AppliedCoupon>,
    last_error: Option<String>,
    receipt: Option<PaymentReceipt>,
}

impl CheckoutFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn address(&self) -> &ShippingAddress {
        &self.address
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn coupon(&self) -> Option<&AppliedCoupon> {
        self.coupon.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn receipt(&self) -> Option<&PaymentReceipt> {
        self.receipt.as_ref()
    }

    pub fn set_customer(&mut self, customer: CustomerInfo) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.customer = customer;
        Ok(())
    }

    pub fn set_address(&mut self, address: ShippingAddress) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.address = address;
        Ok(())
    }

    pub fn set_payment_method(
        &mut self,
        method: PaymentMethod,
        card: Option<CardPayment>,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.payment_method = method;
        self.card = card;
        self.last_error = None;
        Ok(())
    }

    pub fn apply_coupon(&mut self, coupon: Option<AppliedCoupon>) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.coupon = coupon;
        Ok(())
    }

    /// Moves one step forward if the current step's fields are filled in.
    ///
    /// `Review` is left only through [`CheckoutFlow::confirm`].
    pub fn advance(&mut self) -> Result<CheckoutStep, DomainError> {
        let current = self.step();
        match current {
            CheckoutStep::CustomerInfo => self.customer.validate()?,
            CheckoutStep::Address => self.address.validate()?,
            CheckoutStep::PaymentMethod => {}
            CheckoutStep::Review => {
                return Err(DomainError::Conflict(
                    "review is completed by confirming the payment".to_string(),
                ))
            }
            CheckoutStep::Confirmation => return Err(Self::closed()),
        }
        let next = current.next().ok_or_else(Self::closed)?;
        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<CheckoutStep, DomainError> {
        let current = self.step();
        if current == CheckoutStep::Confirmation {
            return Err(Self::closed());
        }
        let previous = current.previous().unwrap_or(current);
        self.step = previous;
        self.last_error = None;
        Ok(previous)
    }

    /// Amount charged for `items`, after the coupon discount.
    pub fn amount_due(&self, items: &[CartItem]) -> BigDecimal {
        let subtotal = items
            .iter()
            .fold(BigDecimal::from(0), |acc, i| acc + i.line_total());
        match &self.coupon {
            Some(coupon) => percent_off(&subtotal, coupon.discount_percent),
            None => round_money(subtotal),
        }
    }

    /// Charges the cart's selected items and, on acceptance, clears them from
    /// the cart and closes the flow.
    pub async fn confirm<S: CartStorage>(
        &mut self,
        order_id: Uuid,
        cart: &mut Cart<S>,
        gateway: &dyn PaymentGateway,
    ) -> Result<PaymentReceipt, DomainError> {
        if self.step() != CheckoutStep::Review {
            return Err(DomainError::Conflict(
                "payment can only be confirmed from the review step".to_string(),
            ));
        }
        let items = cart.selected_items();
        if items.is_empty() {
            return Err(DomainError::InvalidInput(
                "select at least one item to check out".to_string(),
            ));
        }

        let request = self.payment_request(order_id, &items);
        let receipt = match gateway.create_payment(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        if !receipt.status.is_accepted() {
            let detail = receipt
                .status_detail
                .clone()
                .unwrap_or_else(|| "payment was not approved".to_string());
            self.last_error = Some(detail.clone());
            return Err(DomainError::PaymentRejected(detail));
        }

        self.step = CheckoutStep::Confirmation;
        self.last_error = None;
        self.receipt = Some(receipt.clone());
        cart.clear_selected()?;
        Ok(receipt)
    }

    fn payment_request(&self, order_id: Uuid, items: &[CartItem]) -> PaymentRequest {
        let description = match items {
            [only] => only.name.clone(),
            _ => format!("{} itens", items.len()),
        };
        PaymentRequest {
            order_id,
            amount: self.amount_due(items),
            description,
            method: self.payment_method,
            card: self.card.clone(),
            payer: self.customer.clone(),
            items: items
                .iter()
                .map(|i| PaymentItem {
                    product_id: i.product_id,
                    title: i.name.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price.clone(),
                })
                .collect(),
        }
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.step() == CheckoutStep::Confirmation {
            Err(Self::closed())
        } else {
            Ok(())
        }
    }

    fn closed() -> DomainError {
        DomainError::Conflict("checkout is already confirmed".to_string())
    }
}
