//! Slack incoming-webhook client

use async_trait::async_trait;
use tracing::debug;

use super::{http_client, translate_status, ChatNotifier, IntegrationError, SlackMessage};

pub struct SlackClient {
    http_client: reqwest::Client,
}

impl SlackClient {
    pub fn new() -> Result<Self, IntegrationError> {
        Ok(Self {
            http_client: http_client()?,
        })
    }
}

#[async_trait]
impl ChatNotifier for SlackClient {
    async fn post_message(
        &self,
        webhook_url: &str,
        message: &SlackMessage,
    ) -> Result<(), IntegrationError> {
        // Webhook URLs embed a secret; never log them
        debug!("Posting Slack message ({} chars)", message.text.len());

        let response = self
            .http_client
            .post(webhook_url)
            .json(message)
            .send()
            .await
            .map_err(|e| IntegrationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(translate_status(status, body));
        }

        Ok(())
    }
}
