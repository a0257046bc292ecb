//! Cardgen command-line client
//!
//! Turns a photo into a generated greeting card through the generation
//! endpoint, within a daily quota tracked on this machine.

use cardgen_client::config::ClientConfig;
use cardgen_client::download::{deliver_card, CardDelivery};
use cardgen_client::preprocess::encode_image_file;
use cardgen_client::{
    FileStorage, HttpGenerationEndpoint, LocalClock, MemoryStorage, QuotaStorage, QuotaTracker,
    SubmissionController, SubmissionError,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// Greeting card generator
#[derive(Parser)]
#[command(name = "cardgen")]
#[command(author = "Cardgen Team")]
#[command(version = "0.1.0")]
#[command(about = "Turn a photo into a greeting card, a few times a day")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a configuration file (TOML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Generation endpoint URL
    #[arg(long, env = "CARDGEN_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Where quota state is stored
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Keep quota state in memory only
    #[arg(long, global = true)]
    no_persist: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a card from a photo
    Generate {
        /// Photo to transform (PNG, JPEG or GIF)
        image: PathBuf,

        /// Text to put on the card
        #[arg(short, long)]
        text: Option<String>,

        /// Where to save the generated card
        #[arg(short, long, default_value = "greeting-card.jpg")]
        output: PathBuf,
    },

    /// Show how many generations are left today
    Quota,
}

/// Exit codes for distinguishable failures
const EXIT_INVALID: u8 = 2;
const EXIT_QUOTA: u8 = 3;
const EXIT_GENERATION: u8 = 4;
const EXIT_UNSAVED: u8 = 5;

fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = match cli.config {
        Some(ref path) => {
            log::info!("Loading config from {}", path.display());
            ClientConfig::from_file(path)?
        }
        None => ClientConfig::default(),
    };

    // Apply CLI overrides
    if let Some(ref endpoint) = cli.endpoint {
        config.endpoint_url = endpoint.clone();
    }
    if let Some(ref state_file) = cli.state_file {
        config.state_file = state_file.clone();
    }

    config.validate()?;
    Ok(config)
}

fn build_tracker(cli: &Cli, config: &ClientConfig) -> QuotaTracker {
    let storage: Arc<dyn QuotaStorage> = if cli.no_persist {
        Arc::new(MemoryStorage::new())
    } else {
        Arc::new(FileStorage::new(&config.state_file))
    };

    QuotaTracker::new(storage, Arc::new(LocalClock), config.daily_limit)
}

fn show_quota(tracker: &QuotaTracker) {
    let remaining = tracker.remaining();
    let line = format!("{}/{} generations left today", remaining, tracker.limit());
    if remaining == 0 {
        println!("{}", line.red().bold());
    } else {
        println!("{}", line.green());
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.magenta} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

async fn generate(
    config: &ClientConfig,
    tracker: QuotaTracker,
    image: PathBuf,
    text: Option<String>,
    output: PathBuf,
) -> anyhow::Result<ExitCode> {
    let encoded = match encode_image_file(&image, config.max_dimension) {
        Ok(encoded) => encoded,
        Err(e) => {
            eprintln!("{} {}", "Cannot use this photo:".red().bold(), e);
            return Ok(ExitCode::from(EXIT_INVALID));
        }
    };
    log::info!(
        "Prepared {} ({}x{})",
        image.display(),
        encoded.width,
        encoded.height
    );

    let endpoint = HttpGenerationEndpoint::new(&config.endpoint_url, config.request_timeout())?;
    // Built up front: once a card is generated, quota is spent
    let download_client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?;
    let controller = SubmissionController::new(tracker, Arc::new(endpoint), config.retry_policy())
        .with_max_caption_chars(config.max_caption_chars);

    let pb = spinner("Generating your card...");
    let outcome = controller.submit(&encoded.data_uri, text.as_deref()).await;
    pb.finish_and_clear();

    let card = match outcome {
        Ok(card) => card,
        Err(SubmissionError::Validation(reason)) => {
            eprintln!("{} {}", "Check your input:".yellow().bold(), reason);
            return Ok(ExitCode::from(EXIT_INVALID));
        }
        Err(e @ SubmissionError::QuotaExhausted { .. }) => {
            eprintln!("{}", e.to_string().red().bold());
            return Ok(ExitCode::from(EXIT_QUOTA));
        }
        Err(e @ SubmissionError::ExhaustedRetries { .. }) => {
            eprintln!("{}", e.to_string().red());
            eprintln!("{}", "Your daily quota was not used.".dimmed());
            return Ok(ExitCode::from(EXIT_GENERATION));
        }
    };

    let delivery = deliver_card(
        &download_client,
        &card.image_url,
        &output,
        &std::env::temp_dir(),
    )
    .await;

    let code = match delivery {
        CardDelivery::Saved { path, bytes } => {
            println!(
                "{} {} ({} bytes)",
                "Card saved to".green().bold(),
                path.display().to_string().cyan(),
                bytes
            );
            ExitCode::SUCCESS
        }
        CardDelivery::Fallback { path, bytes, error } => {
            eprintln!(
                "{} {}",
                format!("Could not save to {}:", output.display()).yellow().bold(),
                error
            );
            println!(
                "{} {} ({} bytes)",
                "Card saved to".green().bold(),
                path.display().to_string().cyan(),
                bytes
            );
            ExitCode::from(EXIT_UNSAVED)
        }
        CardDelivery::Unsaved { error } => {
            eprintln!("{} {}", "Could not save the card:".red().bold(), error);
            eprintln!("{}", "Generated image reference:".dimmed());
            eprintln!("{}", card.image_url);
            ExitCode::from(EXIT_UNSAVED)
        }
    };

    if card.attempts > 1 {
        println!(
            "{}",
            format!("Succeeded after {} attempts", card.attempts).dimmed()
        );
    }
    println!("{}/{} generations left today", card.remaining, config.daily_limit);

    Ok(code)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let tracker = build_tracker(&cli, &config);

    match cli.command {
        Commands::Quota => {
            show_quota(&tracker);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Generate {
            image,
            text,
            output,
        } => generate(&config, tracker, image, text, output).await,
    }
}
