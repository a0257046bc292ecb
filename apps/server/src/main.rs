use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use cardgen_server::config;
use cardgen_server::routes;
use cardgen_server::services::{GeminiGenerator, ImageGenerator};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load configuration
    let config = config::Config::from_env().map_err(|e| {
        log::error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!(
        "Starting Cardgen server on {}:{} (model {})",
        config.host,
        config.port,
        config.gemini.model
    );
    if config.gemini.proxy_url.is_some() {
        log::info!("Routing Gemini requests through HTTP_PROXY_URL");
    }

    let generator = GeminiGenerator::new(config.gemini.clone()).map_err(|e| {
        log::error!("Generator setup error: {}", e);
        std::io::Error::other(e.to_string())
    })?;
    let generator: Arc<dyn ImageGenerator> = Arc::new(generator);
    let generator = web::Data::from(generator);

    let limits = config.limits.clone();

    let server = HttpServer::new(move || {
        // The page calling us is served from another origin
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .expose_headers(vec![routes::generate::REQUEST_ID_HEADER])
            .max_age(86400);

        App::new()
            .app_data(generator.clone())
            .app_data(web::Data::new(limits.clone()))
            // Middleware
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(cors)
            .configure(routes::health::configure)
            .configure(|cfg| routes::generate::configure(cfg, &limits))
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    log::info!("Server listening on {}:{}", config.host, config.port);

    server.await
}
