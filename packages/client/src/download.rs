//! Saving a generated card to disk.

use chrono::Local;
use reqwest::Client;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::preprocess::{decode_data_uri, PreprocessError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    DataUri(#[from] PreprocessError),
    #[error("Failed to fetch image: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to fetch image: HTTP {0}")]
    Status(u16),
    #[error("Unsupported image reference: {0}")]
    Unsupported(String),
    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves an image reference (data URI or http(s) URL) to bytes
pub async fn fetch_card(client: &Client, image_url: &str) -> Result<Vec<u8>, DownloadError> {
    if image_url.starts_with("data:") {
        let (_mime, bytes) = decode_data_uri(image_url)?;
        return Ok(bytes);
    }

    if image_url.starts_with("http://") || image_url.starts_with("https://") {
        let response = client.get(image_url).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status().as_u16()));
        }
        return Ok(response.bytes().await?.to_vec());
    }

    let preview: String = image_url.chars().take(32).collect();
    Err(DownloadError::Unsupported(preview))
}

/// Fetches the card and writes it to `path`, returning the byte count
pub async fn save_card(client: &Client, image_url: &str, path: &Path) -> Result<usize, DownloadError> {
    let bytes = fetch_card(client, image_url).await?;
    write_card(path, &bytes).await?;
    Ok(bytes.len())
}

async fn write_card(path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Where a generated card ended up
#[derive(Debug)]
pub enum CardDelivery {
    /// Written to the requested path
    Saved { path: PathBuf, bytes: usize },
    /// The requested path failed, the card was written to the fallback instead
    Fallback {
        path: PathBuf,
        bytes: usize,
        error: DownloadError,
    },
    /// Nothing could be written; only the image reference is left
    Unsaved { error: DownloadError },
}

/// Saves a card that already counted against the quota.
///
/// A write failure on `output` retries once under `fallback_dir` so the
/// generation is not lost.
pub async fn deliver_card(
    client: &Client,
    image_url: &str,
    output: &Path,
    fallback_dir: &Path,
) -> CardDelivery {
    let bytes = match fetch_card(client, image_url).await {
        Ok(bytes) => bytes,
        Err(error) => return CardDelivery::Unsaved { error },
    };

    let error = match write_card(output, &bytes).await {
        Ok(()) => {
            return CardDelivery::Saved {
                path: output.to_path_buf(),
                bytes: bytes.len(),
            }
        }
        Err(e) => e,
    };
    log::warn!("Could not write {}: {}", output.display(), error);

    let path = fallback_dir.join(fallback_name(output));
    match write_card(&path, &bytes).await {
        Ok(()) => CardDelivery::Fallback {
            path,
            bytes: bytes.len(),
            error,
        },
        Err(e) => {
            log::warn!("Could not write fallback {}: {}", path.display(), e);
            CardDelivery::Unsaved { error }
        }
    }
}

/// Timestamped file name keeping the extension of the requested output
fn fallback_name(output: &Path) -> String {
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    format!(
        "cardgen-{}.{}",
        Local::now().format("%Y%m%d-%H%M%S%3f"),
        extension
    )
}
