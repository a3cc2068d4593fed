// Payment gateway client (refunds against a stored payment intent)

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::time::Duration;

use crate::gateways::GatewayError;

/// Receipt for a processed refund
#[derive(Debug, Clone)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount_minor_units: i64,
}

/// Refund issuance against a previously captured charge
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn refund(
        &self,
        payment_intent_id: &str,
        amount_minor_units: i64,
    ) -> Result<RefundReceipt, GatewayError>;
}

/// Convert a monetary amount to minor currency units (cents),
/// rounded to the nearest integer with halves away from zero.
pub fn to_minor_units(amount: Decimal) -> i64 {
    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Stripe refunds API client
pub struct StripeClient {
    secret_key: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    amount: i64,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self::with_endpoint(secret_key, "https://api.stripe.com/v1/refunds".to_string())
    }

    pub fn with_endpoint(secret_key: String, endpoint: String) -> Self {
        Self {
            secret_key,
            endpoint,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn refund(
        &self,
        payment_intent_id: &str,
        amount_minor_units: i64,
    ) -> Result<RefundReceipt, GatewayError> {
        if payment_intent_id.is_empty() {
            return Err(GatewayError::Config(
                "refund requested without a payment intent id".to_string(),
            ));
        }

        let amount = amount_minor_units.to_string();
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("payment_intent", payment_intent_id),
                ("amount", amount.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let refund: StripeRefund = response.json().await?;
        tracing::info!(
            "Refund {} processed for intent {} ({} minor units)",
            refund.id,
            payment_intent_id,
            refund.amount
        );

        Ok(RefundReceipt {
            refund_id: refund.id,
            amount_minor_units: refund.amount,
        })
    }
}
