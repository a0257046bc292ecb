//! Image preparation before upload and decoding of generated results.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::path::Path;
use thiserror::Error;

/// Longest side, in pixels, of an uploaded image
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Raw files above this size are refused before decoding
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const JPEG_QUALITY: u8 = 85;

/// Preprocessing errors
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("File is {size} bytes, the maximum is {max}")]
    TooLarge { size: u64, max: u64 },
    #[error("Unsupported image format (expected PNG, JPEG or GIF)")]
    UnsupportedFormat,
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),
}

/// Upload-ready image
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// `data:image/jpeg;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

/// Reads, bounds and re-encodes an image file as a JPEG data URI
pub fn encode_image_file(path: &Path, max_dimension: u32) -> Result<EncodedImage, PreprocessError> {
    let size = std::fs::metadata(path)?.len();
    if size > MAX_UPLOAD_BYTES {
        return Err(PreprocessError::TooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }

    let bytes = std::fs::read(path)?;
    encode_image_bytes(&bytes, max_dimension)
}

/// Same as [`encode_image_file`] for in-memory bytes
pub fn encode_image_bytes(bytes: &[u8], max_dimension: u32) -> Result<EncodedImage, PreprocessError> {
    let format = image::guess_format(bytes).map_err(|_| PreprocessError::UnsupportedFormat)?;
    if !matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif
    ) {
        return Err(PreprocessError::UnsupportedFormat);
    }

    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let bounded = bound_dimensions(decoded, max_dimension);
    let (width, height) = bounded.dimensions();

    // JPEG has no alpha channel
    let rgb = bounded.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode_image(&rgb)?;

    Ok(EncodedImage {
        data_uri: format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)),
        width,
        height,
    })
}

/// Scales the image down so its longest side fits, keeping aspect ratio
fn bound_dimensions(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if max_dimension == 0 || (width <= max_dimension && height <= max_dimension) {
        return image;
    }

    log::debug!(
        "Downscaling {}x{} image to fit {}px",
        width,
        height,
        max_dimension
    );
    image.resize(max_dimension, max_dimension, FilterType::Triangle)
}

/// Splits a base64 data URI into its MIME type and decoded bytes
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), PreprocessError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| PreprocessError::InvalidDataUri("missing data: prefix".to_string()))?;

    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| PreprocessError::InvalidDataUri("missing payload".to_string()))?;

    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| PreprocessError::InvalidDataUri("only base64 payloads are supported".to_string()))?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| PreprocessError::InvalidDataUri(e.to_string()))?;

    let mime = if mime.is_empty() {
        "application/octet-stream".to_string()
    } else {
        mime.to_string()
    };

    Ok((mime, bytes))
}
