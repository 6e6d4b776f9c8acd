//! Payment gateway adapter speaking the Mercado Pago payments API.
//!
//! Card data never reaches this service: the storefront tokenizes it with the
//! gateway's browser SDK and only the token is forwarded here.

use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::ToPrimitive;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::PaymentMethod;
use crate::domain::payment::{PaymentReceipt, PaymentRequest, PaymentStatus};
use crate::domain::ports::PaymentGateway;

const BOLETO_METHOD_ID: &str = "bolbradesco";

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: Value,
    status: String,
    status_detail: Option<String>,
    point_of_interaction: Option<PointOfInteraction>,
    transaction_details: Option<TransactionDetails>,
}

#[derive(Debug, Deserialize)]
struct PointOfInteraction {
    transaction_data: Option<TransactionData>,
}

#[derive(Debug, Deserialize)]
struct TransactionData {
    qr_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionDetails {
    external_resource_url: Option<String>,
}

fn parse_status(raw: &str) -> Result<PaymentStatus, DomainError> {
    match raw {
        "approved" => Ok(PaymentStatus::Approved),
        "pending" | "in_process" | "authorized" | "in_mediation" => Ok(PaymentStatus::Pending),
        "rejected" | "cancelled" => Ok(PaymentStatus::Rejected),
        "refunded" | "charged_back" => Ok(PaymentStatus::Refunded),
        other => Err(DomainError::Gateway(format!(
            "unexpected payment status '{other}'"
        ))),
    }
}

fn id_to_string(id: &Value) -> Result<String, DomainError> {
    match id {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(DomainError::Gateway(format!("unexpected payment id {other}"))),
    }
}

fn receipt_from_response(response: PaymentResponse) -> Result<PaymentReceipt, DomainError> {
    Ok(PaymentReceipt {
        payment_id: id_to_string(&response.id)?,
        status: parse_status(&response.status)?,
        status_detail: response.status_detail,
        qr_code: response
            .point_of_interaction
            .and_then(|p| p.transaction_data)
            .and_then(|t| t.qr_code),
        boleto_url: response
            .transaction_details
            .and_then(|t| t.external_resource_url),
    })
}

fn payment_body(request: &PaymentRequest) -> Result<Value, DomainError> {
    let amount = request
        .amount
        .to_f64()
        .ok_or_else(|| DomainError::InvalidInput("amount is out of range".to_string()))?;

    let items: Vec<Value> = request
        .items
        .iter()
        .map(|i| {
            json!({
                "id": i.product_id.to_string(),
                "title": i.title,
                "quantity": i.quantity,
                "unit_price": i.unit_price.to_f64().unwrap_or_default(),
            })
        })
        .collect();

    let mut body = json!({
        "transaction_amount": amount,
        "description": request.description,
        "external_reference": request.order_id.to_string(),
        "payer": {
            "email": request.payer.email,
            "first_name": request.payer.name,
            "identification": {
                "type": "CPF",
                "number": request.payer.cpf.chars().filter(char::is_ascii_digit).collect::<String>(),
            },
        },
        "additional_info": { "items": items },
    });

    match request.method {
        PaymentMethod::Pix => body["payment_method_id"] = json!("pix"),
        PaymentMethod::Boleto => body["payment_method_id"] = json!(BOLETO_METHOD_ID),
        PaymentMethod::CreditCard => {
            let card = request.card.as_ref().ok_or_else(|| {
                DomainError::InvalidInput("card token is required for credit card".to_string())
            })?;
            body["token"] = json!(card.token);
            body["payment_method_id"] = json!(card.payment_method_id);
            body["installments"] = json!(card.installments.max(1));
        }
    }

    Ok(body)
}

pub struct MercadoPagoGateway {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoGateway {
    pub fn new(base_url: &str, access_token: &str, timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    async fn read_payment(response: reqwest::Response) -> Result<PaymentResponse, DomainError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Gateway(format!(
                "gateway responded {status}: {body}"
            )));
        }
        Ok(response.json::<PaymentResponse>().await?)
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentReceipt, DomainError> {
        let body = payment_body(request)?;

        let response = self
            .client
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", request.order_id.to_string())
            .json(&body)
            .send()
            .await?;

        let receipt = receipt_from_response(Self::read_payment(response).await?)?;
        log::info!(
            "Payment {} for order {} is {}",
            receipt.payment_id,
            request.order_id,
            receipt.status.as_str()
        );
        Ok(receipt)
    }

    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus, DomainError> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let payment = Self::read_payment(response).await?;
        parse_status(&payment.status)
    }

    async fn refund(&self, payment_id: &str) -> Result<(), DomainError> {
        let response = self
            .client
            .post(format!("{}/v1/payments/{}/refunds", self.base_url, payment_id))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", Uuid::new_v4().to_string())
            .json(&json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::Gateway(format!(
                "refund of payment {payment_id} failed with {status}: {body}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::checkout::CustomerInfo;
    use crate::domain::payment::{CardPayment, PaymentItem};

    fn request(method: PaymentMethod, card: Option<CardPayment>) -> PaymentRequest {
        PaymentRequest {
            order_id: Uuid::nil(),
            amount: BigDecimal::from_str("249.90").unwrap(),
            description: "Colar Lua".into(),
            method,
            card,
            payer: CustomerInfo {
                name: "Joana".into(),
                email: "joana@example.com".into(),
                phone: "11900000000".into(),
                cpf: "123.456.789-09".into(),
            },
            items: vec![PaymentItem {
                product_id: 5,
                title: "Colar Lua".into(),
                quantity: 1,
                unit_price: BigDecimal::from_str("249.90").unwrap(),
            }],
        }
    }

    #[test]
    fn pix_body_carries_reference_and_payer() {
        let body = payment_body(&request(PaymentMethod::Pix, None)).unwrap();
        assert_eq!(body["payment_method_id"], "pix");
        assert_eq!(body["transaction_amount"], 249.9);
        assert_eq!(body["external_reference"], Uuid::nil().to_string());
        assert_eq!(body["payer"]["identification"]["number"], "12345678909");
        assert!(body.get("token").is_none());
    }

    #[test]
    fn card_body_requires_token() {
        assert!(matches!(
            payment_body(&request(PaymentMethod::CreditCard, None)),
            Err(DomainError::InvalidInput(_))
        ));

        let card = CardPayment {
            token: "tok_123".into(),
            payment_method_id: "visa".into(),
            installments: 0,
        };
        let body = payment_body(&request(PaymentMethod::CreditCard, Some(card))).unwrap();
        assert_eq!(body["token"], "tok_123");
        assert_eq!(body["payment_method_id"], "visa");
        assert_eq!(body["installments"], 1);
    }

    #[test]
    fn boleto_uses_bank_slip_method() {
        let body = payment_body(&request(PaymentMethod::Boleto, None)).unwrap();
        assert_eq!(body["payment_method_id"], BOLETO_METHOD_ID);
    }

    #[test]
    fn pix_response_exposes_qr_code() {
        let response: PaymentResponse = serde_json::from_value(json!({
            "id": 1234567890u64,
            "status": "pending",
            "status_detail": "pending_waiting_transfer",
            "point_of_interaction": { "transaction_data": { "qr_code": "00020126..." } }
        }))
        .unwrap();
        let receipt = receipt_from_response(response).unwrap();
        assert_eq!(receipt.payment_id, "1234567890");
        assert_eq!(receipt.status, PaymentStatus::Pending);
        assert_eq!(receipt.qr_code.as_deref(), Some("00020126..."));
        assert!(receipt.boleto_url.is_none());
    }

    #[test]
    fn boleto_response_exposes_url() {
        let response: PaymentResponse = serde_json::from_value(json!({
            "id": "abc",
            "status": "pending",
            "transaction_details": { "external_resource_url": "https://boleto.example/abc" }
        }))
        .unwrap();
        let receipt = receipt_from_response(response).unwrap();
        assert_eq!(receipt.boleto_url.as_deref(), Some("https://boleto.example/abc"));
    }

    #[test]
    fn gateway_statuses_map_onto_payment_statuses() {
        assert_eq!(parse_status("approved").unwrap(), PaymentStatus::Approved);
        assert_eq!(parse_status("in_process").unwrap(), PaymentStatus::Pending);
        assert_eq!(parse_status("cancelled").unwrap(), PaymentStatus::Rejected);
        assert_eq!(parse_status("charged_back").unwrap(), PaymentStatus::Refunded);
        assert!(matches!(parse_status("weird"), Err(DomainError::Gateway(_))));
    }
}
