//! HTTP mentor client
//!
//! Talks to a text-generation service that accepts `POST {endpoint}/generate`
//! with a prompt and answers `{"text": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use autolab_common::{ApiStyle, Error, MentorConfig, Result, Scenario};
use autolab_sandbox::mentor::{self, Mentor, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    /// `text` or `json`
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    text: String,
}

/// Mentor backed by a remote generation endpoint
#[derive(Clone)]
pub struct HttpMentor {
    endpoint: String,
    client: Client,
}

impl HttpMentor {
    pub fn new(config: &MentorConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::ServiceUnavailable("no mentor endpoint configured".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("autolab/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::ServiceUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn generate(&self, prompt: &str, response_format: &str) -> Result<String> {
        let url = format!("{}/generate", self.endpoint);
        debug!("POST {} ({} chars)", url, prompt.len());

        let resp = self
            .client
            .post(&url)
            .json(&GenerateRequest { prompt, response_format })
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("request to {} failed: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::ServiceUnavailable(format!("{} returned {}: {}", url, status, detail)));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("invalid response from {}: {}", url, e)))?;
        Ok(body.text)
    }
}

#[async_trait]
impl Mentor for HttpMentor {
    async fn hint(&self, question: &str, style: ApiStyle, scenario_description: Option<&str>) -> Result<String> {
        let prompt = mentor::hint_prompt(question, style, scenario_description);
        self.generate(&prompt, "text").await
    }

    async fn validate(&self, code: &str, scenario: &Scenario, style: ApiStyle) -> Result<Validation> {
        let prompt = mentor::validation_prompt(code, scenario, style);
        let text = self.generate(&prompt, "json").await?;
        mentor::parse_validation(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_endpoint() {
        let config = MentorConfig::default();
        assert!(matches!(HttpMentor::new(&config), Err(Error::ServiceUnavailable(_))));
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = MentorConfig {
            endpoint: Some("http://localhost:9000/".to_string()),
            ..MentorConfig::default()
        };
        let mentor = HttpMentor::new(&config).unwrap();
        assert_eq!(mentor.endpoint(), "http://localhost:9000");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let config = MentorConfig {
            endpoint: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
        };
        let mentor = HttpMentor::new(&config).unwrap();
        let err = mentor.hint("q", ApiStyle::Playwright, None).await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
    }
}
