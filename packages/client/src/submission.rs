//! Submission controller: quota-gated generation with linear-backoff retries.
//!
//! Flow for one `submit` call:
//! 1. validate the input (no network, no quota read on failure)
//! 2. check the remaining quota once
//! 3. run up to `max_attempts` sequential attempts, sleeping
//!    `attempt * base_delay` between them
//! 4. record the success in the quota tracker, or report the last error
//!
//! The quota is only checked before the first attempt. Another process
//! sharing the same state file can consume the last generation while
//! retries are in flight; the in-flight submission still completes and may
//! push the stored count past the limit for that day.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::endpoint::{EndpointError, GenerationEndpoint};
use crate::quota::QuotaTracker;

/// Default caption length bound, in characters
pub const DEFAULT_MAX_CAPTION_CHARS: usize = 200;

/// Terminal failure of a submission
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Invalid submission: {0}")]
    Validation(String),
    #[error("Daily limit of {limit} generations reached, come back tomorrow")]
    QuotaExhausted { limit: u32 },
    #[error("Generation failed after trying {attempts} times: {last_error}")]
    ExhaustedRetries {
        attempts: u32,
        last_error: EndpointError,
    },
}

/// Result of one `submit` call
pub type SubmissionOutcome = Result<GeneratedCard, SubmissionError>;

/// Successful generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCard {
    /// Image reference returned by the endpoint (data URI or URL)
    pub image_url: String,
    /// Number of attempts it took, starting at 1
    pub attempts: u32,
    /// Generations left today after recording this one
    pub remaining: u32,
}

/// Validated, immutable request payload reused across attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    encoded_image: String,
    caption: Option<String>,
}

impl SubmissionRequest {
    /// Validates the inputs. Blank captions are dropped.
    pub fn new(
        encoded_image: impl Into<String>,
        caption: Option<&str>,
        max_caption_chars: usize,
    ) -> Result<Self, SubmissionError> {
        let encoded_image = encoded_image.into();
        if encoded_image.trim().is_empty() {
            return Err(SubmissionError::Validation(
                "an image is required".to_string(),
            ));
        }

        let caption = caption
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        if let Some(ref text) = caption {
            let chars = text.chars().count();
            if chars > max_caption_chars {
                return Err(SubmissionError::Validation(format!(
                    "caption is {} characters, the maximum is {}",
                    chars, max_caption_chars
                )));
            }
        }

        Ok(Self {
            encoded_image,
            caption,
        })
    }

    pub fn encoded_image(&self) -> &str {
        &self.encoded_image
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }
}

/// Bounded retry with linear backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Suspension primitive used between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Drives generation requests against the endpoint
pub struct SubmissionController {
    quota: QuotaTracker,
    endpoint: Arc<dyn GenerationEndpoint>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    max_caption_chars: usize,
}

impl SubmissionController {
    pub fn new(
        quota: QuotaTracker,
        endpoint: Arc<dyn GenerationEndpoint>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            quota,
            endpoint,
            sleeper: Arc::new(TokioSleeper),
            policy,
            max_caption_chars: DEFAULT_MAX_CAPTION_CHARS,
        }
    }

    /// Replaces the timer used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_max_caption_chars(mut self, max_caption_chars: usize) -> Self {
        self.max_caption_chars = max_caption_chars;
        self
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs one user-initiated generation to completion
    pub async fn submit(&self, encoded_image: &str, caption: Option<&str>) -> SubmissionOutcome {
        let request = SubmissionRequest::new(encoded_image, caption, self.max_caption_chars)?;

        if self.quota.remaining() == 0 {
            log::info!("Generation refused: daily quota exhausted");
            return Err(SubmissionError::QuotaExhausted {
                limit: self.quota.limit(),
            });
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.endpoint.generate(&request).await {
                Ok(image_url) => {
                    let remaining = self.quota.record_success();
                    log::info!(
                        "Generation succeeded on attempt {}/{}, {} left today",
                        attempt,
                        max_attempts,
                        remaining
                    );
                    return Ok(GeneratedCard {
                        image_url,
                        attempts: attempt,
                        remaining,
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Generation attempt {}/{} failed: {}",
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                self.sleeper.sleep(self.policy.delay_after(attempt)).await;
            }
        }

        Err(SubmissionError::ExhaustedRetries {
            attempts: max_attempts,
            last_error: last_error
                .unwrap_or_else(|| EndpointError::Transport("no attempt was made".to_string())),
        })
    }
}
