//! Cover image resizing
//!
//! Downloads a game's cover, fits it within 800x600, derives a 250x150
//! thumbnail and writes both as JPEG files into the processed directory.
//! Dimensions are only ever reduced.

use ::image::codecs::jpeg::JpegEncoder;
use ::image::imageops::FilterType;
use ::image::DynamicImage;
use chrono::Utc;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{ImageJob, ProcessedImages};

/// Bounding box of the main image
pub const MAIN_MAX_SIZE: (u32, u32) = (800, 600);

/// Bounding box of the thumbnail
pub const THUMBNAIL_MAX_SIZE: (u32, u32) = (250, 150);

const MAIN_QUALITY: u8 = 85;
const THUMBNAIL_QUALITY: u8 = 75;

/// Public prefix the backend serves processed files under
const PUBLIC_PREFIX: &str = "/processed";

/// Largest source image we are willing to download
pub const MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Downloads and resizes cover images
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    client: reqwest::Client,
    output_dir: PathBuf,
    max_download_bytes: u64,
}

impl ImageProcessor {
    /// Create an image processor writing into `output_dir`
    pub fn new(output_dir: impl AsRef<Path>, download_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(download_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            output_dir: output_dir.as_ref().to_path_buf(),
            max_download_bytes: MAX_DOWNLOAD_BYTES,
        })
    }

    /// Override the download size cap
    pub fn with_max_download_bytes(mut self, max_download_bytes: u64) -> Self {
        self.max_download_bytes = max_download_bytes;
        self
    }

    /// Directory processed files are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process the cover image of `job`
    ///
    /// Returns `None` when the game has no real image to process.
    pub async fn process(&self, job: &ImageJob) -> Result<Option<ProcessedImages>> {
        let url = match job.source_url() {
            Some(url) => url,
            None => {
                info!(game_id = %job.game_id, "No image URL provided, keeping placeholder");
                return Ok(None);
            },
        };

        info!(game_id = %job.game_id, url, "Processing image");
        let bytes = self.download(url).await?;

        let output_dir = self.output_dir.clone();
        let game_id = job.game_id.clone();
        let timestamp = Utc::now().timestamp();

        let images = tokio::task::spawn_blocking(move || {
            render(&bytes, &output_dir, &game_id, timestamp)
        })
        .await
        .map_err(|e| Error::internal(format!("Image task failed: {}", e)))??;

        info!(
            game_id = %job.game_id,
            main = %images.main,
            thumbnail = %images.thumbnail,
            "Image processing complete"
        );

        Ok(Some(images))
    }

    /// Download `url`, refusing bodies larger than the size cap
    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();

        if status.is_client_error() {
            return Err(Error::validation(format!(
                "Image download from {} failed with status {}",
                url, status
            )));
        }
        if !status.is_success() {
            return Err(Error::http(format!(
                "Image download from {} failed with status {}",
                url, status
            )));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_download_bytes {
                return Err(self.too_large(url));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (bytes.len() + chunk.len()) as u64 > self.max_download_bytes {
                return Err(self.too_large(url));
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(url, bytes = bytes.len(), "Image downloaded");
        Ok(bytes)
    }

    fn too_large(&self, url: &str) -> Error {
        Error::validation(format!(
            "Image at {} exceeds the {} byte download limit",
            url, self.max_download_bytes
        ))
    }
}

/// Decode, resize and save an image, returning the public paths
pub fn render(
    bytes: &[u8],
    output_dir: &Path,
    game_id: &str,
    timestamp: i64,
) -> Result<ProcessedImages> {
    let source = ::image::load_from_memory(bytes)?;

    let main = fit_within(&source, MAIN_MAX_SIZE);
    let thumbnail = fit_within(&main, THUMBNAIL_MAX_SIZE);

    std::fs::create_dir_all(output_dir)?;

    let stem = file_stem(game_id);
    let main_name = format!("{}_{}_main.jpg", stem, timestamp);
    let thumb_name = format!("{}_{}_thumb.jpg", stem, timestamp);

    save_jpeg(&main, &output_dir.join(&main_name), MAIN_QUALITY)?;
    save_jpeg(&thumbnail, &output_dir.join(&thumb_name), THUMBNAIL_QUALITY)?;

    Ok(ProcessedImages {
        main: format!("{}/{}", PUBLIC_PREFIX, main_name),
        thumbnail: format!("{}/{}", PUBLIC_PREFIX, thumb_name),
    })
}

/// Shrink `image` to fit the bounding box, keeping its aspect ratio
pub fn fit_within(image: &DynamicImage, (max_width, max_height): (u32, u32)) -> DynamicImage {
    if image.width() <= max_width && image.height() <= max_height {
        return image.clone();
    }
    image.resize(max_width, max_height, FilterType::Lanczos3)
}

fn save_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let rgb = image.to_rgb8();
    JpegEncoder::new_with_quality(&mut writer, quality).encode_image(&rgb)?;
    writer.flush()?;
    Ok(())
}

/// Ids end up in file names; keep them to a safe character set
fn file_stem(game_id: &str) -> String {
    game_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
