//! Catalog ingestion: download each character image, embed it, collect vectors.

use std::time::{Duration, Instant};

use clip_encoder::ImageEncoder;
use tracing::{debug, info, warn};

use crate::errors::index_error::IndexError;
use crate::structs::character::CharacterRecord;
use crate::structs::index_config::CatalogConfig;

/// Fetch raw image bytes for `url`.
///
/// # Errors
/// `IndexError::ImageDownload` on transport failure or non-2xx status.
pub async fn download_image(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, IndexError> {
    let fail = |reason: String| IndexError::ImageDownload {
        url: url.to_string(),
        reason,
    };

    let resp = http
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| fail(e.to_string()))?;

    if !resp.status().is_success() {
        return Err(fail(format!("status {}", resp.status())));
    }

    let bytes = resp.bytes().await.map_err(|e| fail(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Embed every record's image. Failures are logged and skipped; the encoder
/// is paced by `request_delay_ms` after each success.
pub async fn build_catalog_vectors(
    records: Vec<CharacterRecord>,
    encoder: &dyn ImageEncoder,
    http: &reqwest::Client,
    cfg: &CatalogConfig,
) -> Vec<(CharacterRecord, Vec<f32>)> {
    let started = Instant::now();
    let total = records.len();
    let timeout = Duration::from_secs(cfg.image_timeout_secs);
    let delay = Duration::from_millis(cfg.request_delay_ms);

    let mut out = Vec::with_capacity(total);
    for record in records {
        let bytes = match download_image(http, &record.image_url, timeout).await {
            Ok(b) => b,
            Err(e) => {
                warn!(id = record.anilist_id, error = %e, "skipping character: download failed");
                continue;
            }
        };

        match encoder.encode(&bytes).await {
            Ok(vector) => {
                debug!(id = record.anilist_id, name = %record.name, "character encoded");
                out.push((record, vector));
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(e) => {
                warn!(id = record.anilist_id, error = %e, "skipping character: encode failed");
            }
        }
    }

    info!(
        target: "character_index::ingest",
        encoded = out.len(),
        skipped = total - out.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "catalog vectors built"
    );
    out
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use clip_encoder::{ClipProvider, EncoderDescriptor};
    use httpmock::prelude::*;

    use super::*;

    /// Encodes the first byte of the image into a 2-d vector; rejects empty input.
    struct ByteEncoder;

    #[async_trait]
    impl ImageEncoder for ByteEncoder {
        fn descriptor(&self) -> EncoderDescriptor {
            EncoderDescriptor {
                provider: ClipProvider::Remote,
                model: "byte".into(),
                device: "test".into(),
                dim: 2,
            }
        }

        async fn encode(&self, image: &[u8]) -> clip_encoder::Result<Vec<f32>> {
            match image.first() {
                Some(&b) => Ok(vec![b as f32, 1.0]),
                None => Err(clip_encoder::ClipError::ImageData(
                    clip_encoder::error_handler::ImageDataError::Empty,
                )),
            }
        }
    }

    fn record(id: i64, url: String) -> CharacterRecord {
        CharacterRecord {
            anilist_id: id,
            name: format!("Character {id}"),
            anime: "Unknown".into(),
            description: String::new(),
            image_url: url,
        }
    }

    #[tokio::test]
    async fn skips_failed_downloads_and_encodes() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok.png");
            then.status(200).body([7u8, 8, 9]);
        });
        server.mock(|when, then| {
            when.method(GET).path("/missing.png");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).path("/empty.png");
            then.status(200).body("");
        });

        let cfg = CatalogConfig {
            request_delay_ms: 0,
            ..CatalogConfig::default()
        };
        let records = vec![
            record(1, server.url("/ok.png")),
            record(2, server.url("/missing.png")),
            record(3, server.url("/empty.png")),
        ];

        let built =
            build_catalog_vectors(records, &ByteEncoder, &reqwest::Client::new(), &cfg).await;

        assert_eq!(built.len(), 1);
        assert_eq!(built[0].0.anilist_id, 1);
        assert_eq!(built[0].1, vec![7.0, 1.0]);
    }
}
