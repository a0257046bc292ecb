//! Validation of uploaded images and captions.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{AppError, AppResult};

/// MIME type assumed for bare base64 uploads
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Base64 image payload ready to inline into a model request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 without the data URI prefix
    pub data: String,
}

impl InlineImage {
    /// Parses a data URI (`data:image/png;base64,...`) or bare base64 string
    pub fn from_upload(raw: &str) -> AppResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AppError::Validation("imageBase64 is required".to_string()));
        }

        let (mime_type, data) = match raw.split_once(',') {
            Some((meta, data)) => (parse_data_uri_meta(meta)?, data),
            None => (DEFAULT_MIME_TYPE.to_string(), raw),
        };

        if data.is_empty() {
            return Err(AppError::Validation("imageBase64 is required".to_string()));
        }

        // Only validity matters here; the payload is forwarded as-is
        STANDARD
            .decode(data)
            .map_err(|_| AppError::Validation("imageBase64 is not valid base64".to_string()))?;

        Ok(Self {
            mime_type,
            data: data.to_string(),
        })
    }
}

fn parse_data_uri_meta(meta: &str) -> AppResult<String> {
    let mime = meta
        .strip_prefix("data:")
        .and_then(|m| m.strip_suffix(";base64"))
        .ok_or_else(|| {
            AppError::Validation("imageBase64 must be a base64 data URI".to_string())
        })?;

    if !mime.starts_with("image/") {
        return Err(AppError::Validation(format!(
            "unsupported content type: {}",
            mime
        )));
    }

    Ok(mime.to_string())
}

/// Trims the caption, drops it when blank and enforces the length bound
pub fn normalize_caption(caption: Option<&str>, max_chars: usize) -> AppResult<Option<String>> {
    let Some(text) = caption.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };

    let chars = text.chars().count();
    if chars > max_chars {
        return Err(AppError::Validation(format!(
            "customText is {} characters, the maximum is {}",
            chars, max_chars
        )));
    }

    Ok(Some(text.to_string()))
}
