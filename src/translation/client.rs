use crate::utils::{Result, SheetTranslatorError, TranslationDefaults};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A stateless text translation capability.
///
/// Implementations do not retry; a failure is reported once and the caller
/// decides what to do with the affected row.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str)
        -> Result<String>;
}

/// Google Cloud Translation (v2 REST) client.
pub struct TranslationClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    target: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

impl TranslationClient {
    pub fn new(config: &TranslationDefaults) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn call_api(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String> {
        let request = TranslateRequest {
            q: text,
            target: target_lang,
            source: Some(source_lang).filter(|s| !s.is_empty() && *s != "auto"),
            format: "text",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SheetTranslatorError::ApiError(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: TranslateResponse = response.json().await?;

        api_response
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| SheetTranslatorError::ApiError("No translation in response".to_string()))
    }
}

#[async_trait]
impl Translator for TranslationClient {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String> {
        self.call_api(text, source_lang, target_lang)
            .await
            .map_err(|e| SheetTranslatorError::RowTranslation(e.to_string()))
    }
}
