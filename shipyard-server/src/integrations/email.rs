//! HTTP email API client
//!
//! Speaks the Resend-style `POST {base}/emails` contract with a bearer key.

use async_trait::async_trait;
use tracing::info;

use super::{http_client, translate_status, EmailMessage, IntegrationError, Mailer};

pub struct HttpMailer {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, IntegrationError> {
        Ok(Self {
            http_client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), IntegrationError> {
        let response = self
            .http_client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await
            .map_err(|e| IntegrationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(translate_status(status, body));
        }

        info!(recipients = message.to.len(), subject = %message.subject, "Email sent");
        Ok(())
    }
}
