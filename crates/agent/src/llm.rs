use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlgate_core::config::LlmConfig;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Non-streaming client for a `/api/generate` style completion endpoint
/// that is asked for JSON output.
#[derive(Clone, Debug)]
pub struct HttpIntentClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpIntentClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build intent service HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.model.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LlmClient for HttpIntentClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest { model: &self.model, prompt, stream: false, format: "json" };
        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            bail!("intent service answered with HTTP {status}");
        }

        let payload: GenerateResponse =
            response.json().await.context("intent service reply has no `response` string")?;
        Ok(payload.response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sqlgate_core::config::LlmConfig;

    use super::HttpIntentClient;

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let client = HttpIntentClient::new(
            "http://localhost:11434/",
            "llama3.1",
            None,
            Duration::from_secs(5),
        )
        .expect("client builds");

        assert_eq!(client.endpoint(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn builds_from_config() {
        let config = LlmConfig {
            enabled: true,
            base_url: "https://intent.internal".to_string(),
            model: "sql-intent".to_string(),
            api_key: None,
            timeout_secs: 3,
        };

        let client = HttpIntentClient::from_config(&config).expect("client builds");
        assert_eq!(client.endpoint(), "https://intent.internal/api/generate");
    }
}
