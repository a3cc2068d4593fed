// Push-notification gateway client

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::gateways::GatewayError;

/// Outcome of a multicast push delivery
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub success_count: u32,
    pub failure_count: u32,
}

/// Best-effort push delivery to a set of device tokens
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &HashMap<String, String>,
    ) -> Result<DeliveryReport, GatewayError>;
}

/// FCM HTTP client
pub struct FcmClient {
    server_key: String,
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    success: u32,
    #[serde(default)]
    failure: u32,
}

impl FcmClient {
    pub fn new(server_key: String) -> Self {
        Self::with_endpoint(server_key, "https://fcm.googleapis.com/fcm/send".to_string())
    }

    pub fn with_endpoint(server_key: String, endpoint: String) -> Self {
        Self {
            server_key,
            endpoint,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl PushGateway for FcmClient {
    async fn send(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &HashMap<String, String>,
    ) -> Result<DeliveryReport, GatewayError> {
        // Empty token lists are a no-op, not an error
        let tokens: Vec<&String> = tokens.iter().filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            tracing::debug!("No device tokens registered, skipping push");
            return Ok(DeliveryReport::default());
        }

        let payload = serde_json::json!({
            "registration_ids": tokens,
            "notification": { "title": title, "body": body },
            "data": data,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
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

        let parsed: FcmResponse = response.json().await?;
        tracing::debug!(
            "Push delivered: {}/{} tokens",
            parsed.success,
            parsed.success + parsed.failure
        );

        Ok(DeliveryReport {
            success_count: parsed.success,
            failure_count: parsed.failure,
        })
    }
}
