use async_trait::async_trait;
use actix_web::web;
use cardgen_server::config::RequestLimits;
use cardgen_server::error::{AppError, AppResult};
use cardgen_server::services::{ImageGenerator, InlineImage};
use std::sync::{Arc, Mutex};

/// Recorded call to the fake generator
#[derive(Debug, Clone)]
pub struct GeneratorCall {
    pub image: InlineImage,
    pub caption: Option<String>,
}

/// Generator returning a canned result and recording its inputs
pub struct FakeGenerator {
    result: Mutex<Box<dyn Fn() -> AppResult<String> + Send>>,
    calls: Mutex<Vec<GeneratorCall>>,
    configured: bool,
}

impl FakeGenerator {
    pub fn succeeding(image_url: &str) -> Arc<Self> {
        let image_url = image_url.to_string();
        Arc::new(Self {
            result: Mutex::new(Box::new(move || Ok(image_url.clone()))),
            calls: Mutex::new(Vec::new()),
            configured: true,
        })
    }

    pub fn failing(make_error: impl Fn() -> AppError + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Box::new(move || Err(make_error()))),
            calls: Mutex::new(Vec::new()),
            configured: true,
        })
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Box::new(|| Err(AppError::Internal("not configured".to_string())))),
            calls: Mutex::new(Vec::new()),
            configured: false,
        })
    }

    pub fn calls(&self) -> Vec<GeneratorCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for FakeGenerator {
    async fn generate(&self, image: &InlineImage, caption: Option<&str>) -> AppResult<String> {
        self.calls.lock().unwrap().push(GeneratorCall {
            image: image.clone(),
            caption: caption.map(str::to_string),
        });
        (self.result.lock().unwrap())()
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// App data for a test service built around `generator`
pub fn test_app_data(generator: Arc<FakeGenerator>) -> (web::Data<dyn ImageGenerator>, RequestLimits) {
    let generator: Arc<dyn ImageGenerator> = generator;
    (web::Data::from(generator), RequestLimits::default())
}
