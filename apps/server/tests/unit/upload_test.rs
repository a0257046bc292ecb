//! Unit tests for upload validation
//!
//! Tests data URI parsing and caption bounds used by the generation route.

use cardgen_server::error::AppError;
use cardgen_server::services::{normalize_caption, InlineImage};

// =============================================================================
// Image Upload Tests
// =============================================================================

#[test]
fn test_upload_with_jpeg_data_uri() {
    let image = InlineImage::from_upload("data:image/jpeg;base64,/9j/4AAQ").unwrap();
    assert_eq!(image.mime_type, "image/jpeg");
    assert_eq!(image.data, "/9j/4AAQ");
}

#[test]
fn test_upload_surrounding_whitespace_is_ignored() {
    let image = InlineImage::from_upload("  data:image/gif;base64,R0lGODlh  ").unwrap();
    assert_eq!(image.mime_type, "image/gif");
    assert_eq!(image.data, "R0lGODlh");
}

#[test]
fn test_upload_empty_is_rejected() {
    for raw in ["", "   ", "data:image/png;base64,"] {
        let err = InlineImage::from_upload(raw).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "input {:?}", raw);
    }
}

#[test]
fn test_upload_without_base64_marker_is_rejected() {
    let err = InlineImage::from_upload("data:image/png,rawbytes").unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn test_upload_invalid_base64_is_rejected() {
    let err = InlineImage::from_upload("%%%%").unwrap_err();
    assert_eq!(err.to_string(), "imageBase64 is not valid base64");
}

// =============================================================================
// Caption Tests
// =============================================================================

#[test]
fn test_caption_at_limit_is_accepted() {
    let caption = "ё".repeat(200);
    assert_eq!(
        normalize_caption(Some(&caption), 200).unwrap(),
        Some(caption.clone())
    );
}

#[test]
fn test_caption_over_limit_is_rejected() {
    let caption = "ё".repeat(201);
    let err = normalize_caption(Some(&caption), 200).unwrap_err();
    assert_eq!(
        err.to_string(),
        "customText is 201 characters, the maximum is 200"
    );
}
