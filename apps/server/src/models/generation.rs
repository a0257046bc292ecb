use serde::{Deserialize, Serialize};

/// DTO for a generation request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Data URI or bare base64 image
    #[serde(default)]
    pub image_base64: String,
    /// Text to render on the card
    #[serde(default)]
    pub custom_text: Option<String>,
}

/// Successful generation response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    /// `data:image/...;base64,...`
    pub image_url: String,
    pub request_id: String,
}

impl GenerateResponse {
    pub fn new(image_url: String, request_id: String) -> Self {
        Self {
            success: true,
            image_url,
            request_id,
        }
    }
}
