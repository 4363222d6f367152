//! Out-of-band artifact delivery by email.

use crate::storage::Artifact;
use crate::utils::{NotifyConfig, Result, SheetTranslatorError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, address: &str, artifact: &Artifact) -> Result<()>;
}

/// Sends mail through an HTTP mail relay (JSON `{from, to, subject, text}`).
pub struct MailRelayNotifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    from_address: String,
}

#[derive(Debug, Serialize)]
struct MailMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    text: String,
}

impl MailRelayNotifier {
    pub fn new(endpoint: impl Into<String>, from_address: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
            from_address: from_address.into(),
        })
    }

    /// `None` when no relay endpoint is configured.
    pub fn from_config(config: &NotifyConfig) -> Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.as_deref() else {
            return Ok(None);
        };

        let mut notifier = Self::new(endpoint, config.from_address.clone())?;
        notifier.api_key = config.api_key.clone();
        Ok(Some(notifier))
    }

    fn compose<'a>(&'a self, address: &'a str, artifact: &Artifact) -> MailMessage<'a> {
        MailMessage {
            from: &self.from_address,
            to: address,
            subject: "Your translated file is ready".to_string(),
            text: format!(
                "Your file has been translated.\n\nDownload: {}\n",
                artifact.access_reference()
            ),
        }
    }
}

#[async_trait]
impl Notifier for MailRelayNotifier {
    async fn send(&self, address: &str, artifact: &Artifact) -> Result<()> {
        let message = self.compose(address, artifact);

        let mut request = self.client.post(&self.endpoint).json(&message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SheetTranslatorError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetTranslatorError::Notification(format!(
                "Mail relay returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}
