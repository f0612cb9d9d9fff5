//! AI text generation backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::tree::node::EntryId;

/// Default generation service base URL.
pub const DEFAULT_AI_BASE_URL: &str = "http://127.0.0.1:8000/api/v1/ollama";

/// What the generator is asked to continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub id: EntryId,
    pub user_query: String,
    pub context: String,
    pub text: String,
    /// Model to run; the server picks its default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    token: &'a str,
    #[serde(flatten)]
    request: &'a GenerationRequest,
}

#[derive(Debug, Default, Deserialize)]
struct WireResponse {
    #[serde(default)]
    param: Option<WireParam>,
}

#[derive(Debug, Default, Deserialize)]
struct WireParam {
    #[serde(default)]
    response: Option<String>,
}

/// Produces text for a document.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generated text, or `None` when the backend returned nothing usable.
    async fn generate(&self, token: &str, request: &GenerationRequest) -> Result<Option<String>>;
}

/// [`Generator`] backed by the workspace's generation endpoint.
pub struct HttpGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGenerator {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn extract_response(body: &[u8]) -> Result<Option<String>> {
    let parsed: WireResponse = serde_json::from_slice(body)?;
    Ok(parsed
        .param
        .and_then(|p| p.response)
        .filter(|text| !text.is_empty()))
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, token: &str, request: &GenerationRequest) -> Result<Option<String>> {
        let url = format!("{}/addRequest", self.base_url);
        tracing::debug!(url = %url, file = request.id, model = ?request.model, "generation request");
        let response = self
            .client
            .post(&url)
            .json(&WireRequest { token, request })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Api {
                status: status.as_u16(),
                url,
            });
        }
        extract_response(&response.bytes().await?)
    }
}

/// Generator used when generation is disabled in the config.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _token: &str, _request: &GenerationRequest) -> Result<Option<String>> {
        Ok(None)
    }
}
