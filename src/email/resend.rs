use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use crate::email::{Mailer, OutboundEmail};
use crate::error::{CardError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

/// Delivery through the Resend HTTP API.
#[derive(Clone, Debug)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl ResendMailer {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            endpoint: RESEND_API_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<Value> {
        debug!(
            to = ?email.to,
            html_bytes = email.html.len(),
            attachments = email.attachments.len(),
            "sending card email"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = provider_error_message(status, &text);
            error!(%status, %message, "Resend API error");
            return Err(CardError::Provider(message));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Resend reports failures as `{ "statusCode", "name", "message" }`.
fn provider_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Resend request failed: {status} {body}"))
}
