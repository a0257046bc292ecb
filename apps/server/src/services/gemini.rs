//! Gemini image generation.
//!
//! Sends the uploaded photo with the card prompt to the `generateContent`
//! endpoint and pulls the first inline image out of the reply.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::image::InlineImage;
use crate::config::GeminiConfig;
use crate::error::{AppError, AppResult};

/// Style prompt for every card
pub const CARD_PROMPT: &str = "\
Turn the person in the attached photo into the centerpiece of an over-the-top, \
maximalist greeting card in the style of tacky Eastern European holiday postcards. \
Cut the main subject out of the original background and blend them into the scene, \
without a photo frame around them.

Style requirements:
- Background: loud clashing gradients or dense rose and daisy patterns, fully saturated.
- Decorations everywhere: glossy red roses, glitter, sparkles, lens flares, doves, \
butterflies, hearts, kittens and puppies with huge shiny eyes, gold coins, champagne, \
rainbows, sunbeams and falling petals.
- An ornate golden baroque or pearl border around the edges of the whole card.
- Large calligraphic 3D text in gold or rainbow gradient with a thick outline and \
heavy drop shadow.
- Extreme saturation, many light sources, glossy plastic finish, glow everywhere.

The result should be so kitschy it becomes funny and endearing.";

/// Text instruction used when the user gave no caption
const DEFAULT_TEXT_INSTRUCTION: &str = "\
All text must be in Russian. Pick one heartfelt wish such as \
\"Счастья, здоровья, всех благ!\", \"Мира и добра вашему дому!\" or \
\"Пусть сбудутся все мечты!\", or write a similar one.";

/// Generates a card image from a photo
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the generated card as a data URI
    async fn generate(&self, image: &InlineImage, caption: Option<&str>) -> AppResult<String>;

    /// Whether the generator can serve requests
    fn is_configured(&self) -> bool {
        true
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text { text: String },
    Image { inline_data: RequestInlineData<'a> },
}

#[derive(Debug, Serialize)]
struct RequestInlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    response_modalities: [&'static str; 2],
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
            response_modalities: ["TEXT", "IMAGE"],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default, alias = "inlineData")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    #[serde(default, alias = "mimeType")]
    mime_type: Option<String>,
    data: String,
}

// =============================================================================
// Gemini generator
// =============================================================================

/// Gemini `generateContent` client
pub struct GeminiGenerator {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    /// Creates a new generator, routing through the configured proxy if any
    pub fn new(config: GeminiConfig) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);

        if let Some(ref proxy_url) = config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| AppError::Internal(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint_url(&self) -> AppResult<url::Url> {
        let base = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        url::Url::parse_with_params(&base, &[("key", self.config.api_key.as_str())])
            .map_err(|e| AppError::Internal(format!("Invalid Gemini URL: {}", e)))
    }
}

/// Full prompt text for a request
pub fn build_prompt(caption: Option<&str>) -> String {
    match caption {
        Some(text) => format!(
            "{}\n\nThe card must display exactly this text, spelled as given: \"{}\"",
            CARD_PROMPT, text
        ),
        None => format!("{}\n\n{}", CARD_PROMPT, DEFAULT_TEXT_INSTRUCTION),
    }
}

/// Extracts the first inline image of the first candidate as a data URI
pub fn extract_image(body: &str) -> AppResult<String> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| AppError::NoImage {
            message: "No image generated".to_string(),
            details: format!("Unparseable response: {}", e),
        })?;

    let candidate = response.candidates.into_iter().next().ok_or_else(|| AppError::NoImage {
        message: "No image generated".to_string(),
        details: truncate(body),
    })?;

    let image = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .find_map(|part| part.inline_data)
        .ok_or_else(|| AppError::NoImage {
            message: "No image data in response".to_string(),
            details: truncate(body),
        })?;

    let mime_type = image.mime_type.unwrap_or_else(|| "image/jpeg".to_string());
    Ok(format!("data:{};base64,{}", mime_type, image.data))
}

/// Keeps error details readable when the upstream echoes large payloads
fn truncate(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[async_trait]
impl ImageGenerator for GeminiGenerator {
    async fn generate(&self, image: &InlineImage, caption: Option<&str>) -> AppResult<String> {
        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: build_prompt(caption),
                    },
                    RequestPart::Image {
                        inline_data: RequestInlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig::default(),
        };

        let response = self
            .client
            .post(self.endpoint_url()?)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Transport("Request timed out".to_string())
                } else if e.is_connect() {
                    AppError::Transport("Connection failed".to_string())
                } else {
                    // Strip the URL, it carries the API key
                    AppError::Transport(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(e.without_url().to_string()))?;

        if !status.is_success() {
            log::warn!("Gemini returned HTTP {}", status.as_u16());
            return Err(AppError::Upstream {
                status: status.as_u16(),
                details: truncate(&body),
            });
        }

        extract_image(&body)
    }

    fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}
