//! Generation endpoint client.
//!
//! The controller sees the endpoint as one async call that either yields an
//! image reference or an [`EndpointError`]. Every endpoint error is
//! transient from the controller's point of view and gets retried.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::submission::SubmissionRequest;

/// Failure of a single attempt against the endpoint
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Generation rejected: {0}")]
    Rejected(String),
}

/// Remote image generation
#[async_trait]
pub trait GenerationEndpoint: Send + Sync {
    /// Performs one attempt and returns the generated image reference
    async fn generate(&self, request: &SubmissionRequest) -> Result<String, EndpointError>;
}

/// Wire body sent to the endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    image_base64: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_text: Option<&'a str>,
}

/// Wire body returned by the endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReply {
    success: bool,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// JSON-over-HTTP endpoint client
pub struct HttpGenerationEndpoint {
    client: Client,
    url: String,
}

impl HttpGenerationEndpoint {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GenerationEndpoint for HttpGenerationEndpoint {
    async fn generate(&self, request: &SubmissionRequest) -> Result<String, EndpointError> {
        let body = GenerateBody {
            image_base64: request.encoded_image(),
            custom_text: request.caption(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EndpointError::Transport("Request timed out".to_string())
                } else if e.is_connect() {
                    EndpointError::Transport("Connection failed".to_string())
                } else {
                    EndpointError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EndpointError::Transport(e.to_string()))?;

        if !status.is_success() {
            // Prefer the endpoint's own error message when it sent one
            let body = serde_json::from_str::<GenerateReply>(&text)
                .ok()
                .and_then(|reply| reply.error)
                .unwrap_or(text);
            return Err(EndpointError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_reply(&text)
    }
}

/// Interprets a 2xx response body
fn parse_reply(text: &str) -> Result<String, EndpointError> {
    let reply: GenerateReply =
        serde_json::from_str(text).map_err(|e| EndpointError::Malformed(e.to_string()))?;

    if !reply.success {
        return Err(EndpointError::Rejected(
            reply
                .error
                .unwrap_or_else(|| "endpoint reported failure".to_string()),
        ));
    }

    match reply.image_url {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(EndpointError::Rejected(
            "success reported without an image".to_string(),
        )),
    }
}
