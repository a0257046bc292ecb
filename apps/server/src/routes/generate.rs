use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse, ResponseError};
use uuid::Uuid;

use crate::config::RequestLimits;
use crate::error::{AppError, AppResult};
use crate::models::{GenerateRequest, GenerateResponse};
use crate::services::{normalize_caption, ImageGenerator, InlineImage};

/// Header echoing the request id on every generation response
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// POST /api/generate
/// Turns an uploaded photo into a greeting card
pub async fn generate_card(
    generator: web::Data<dyn ImageGenerator>,
    limits: web::Data<RequestLimits>,
    body: web::Json<GenerateRequest>,
) -> HttpResponse {
    let request_id = Uuid::new_v4().to_string();

    match run_generation(generator.get_ref(), limits.get_ref(), body.into_inner()).await {
        Ok(image_url) => {
            log::info!("Card generated for request {}", request_id);
            HttpResponse::Ok()
                .insert_header((REQUEST_ID_HEADER, request_id.clone()))
                .json(GenerateResponse::new(image_url, request_id))
        }
        Err(e) => {
            match &e {
                AppError::Validation(_) => {
                    log::debug!("Rejected request {}: {}", request_id, e)
                }
                _ => log::warn!("Generation failed for request {}: {}", request_id, e),
            }
            let mut response = e.error_response();
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            response
        }
    }
}

async fn run_generation(
    generator: &dyn ImageGenerator,
    limits: &RequestLimits,
    request: GenerateRequest,
) -> AppResult<String> {
    let image = InlineImage::from_upload(&request.image_base64)?;
    let caption = normalize_caption(request.custom_text.as_deref(), limits.max_caption_chars)?;

    generator.generate(&image, caption.as_deref()).await
}

/// Any other method on the generation resource
pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed().json(serde_json::json!({ "error": "Method not allowed" }))
}

/// Maps body parsing failures to the JSON error shape
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = match err {
        JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
            "Image is too large".to_string()
        }
        other => format!("Invalid request body: {}", other),
    };
    AppError::Validation(message).into()
}

/// Registers the generation route
pub fn configure(cfg: &mut web::ServiceConfig, limits: &RequestLimits) {
    cfg.service(
        web::resource("/api/generate")
            .app_data(
                web::JsonConfig::default()
                    .limit(limits.max_payload_bytes)
                    .error_handler(json_error_handler),
            )
            .route(web::post().to(generate_card))
            .default_service(web::route().to(method_not_allowed)),
    );
}
