//! In-process CLIP ViT-B/32 through `fastembed` (ONNX Runtime, CPU).
//!
//! Model files are fetched into the fastembed cache on first load, which can
//! take minutes; callers load it from a background task.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use fastembed::{ImageEmbedding, ImageEmbeddingModel, ImageInitOptions};
use tracing::{debug, info};

use crate::{
    config::{clip_model_config::ClipModelConfig, clip_provider::ClipProvider},
    encoder::{EncoderDescriptor, ImageEncoder, finalize_embedding},
    error_handler::{ConfigError, ProviderError, Result},
};

pub struct LocalClipService {
    model: Arc<ImageEmbedding>,
    cfg: ClipModelConfig,
}

impl LocalClipService {
    /// Loads the ONNX vision encoder on a blocking thread.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not `Local`
    /// - [`ProviderError::Inference`] if the model cannot be fetched or initialized
    pub async fn load(cfg: ClipModelConfig) -> Result<Self> {
        if cfg.provider != ClipProvider::Local {
            return Err(ConfigError::UnsupportedProvider(cfg.provider.to_string()).into());
        }

        let started = Instant::now();
        let model = tokio::task::spawn_blocking(|| {
            ImageEmbedding::try_new(
                ImageInitOptions::new(ImageEmbeddingModel::ClipVitB32)
                    .with_show_download_progress(false),
            )
        })
        .await
        .map_err(|e| ProviderError::Inference(format!("model loader panicked: {e}")))?
        .map_err(|e| ProviderError::Inference(format!("model init: {e}")))?;

        info!(
            model = %cfg.model,
            elapsed_ms = started.elapsed().as_millis(),
            "local CLIP model loaded"
        );

        Ok(Self {
            model: Arc::new(model),
            cfg,
        })
    }
}

#[async_trait]
impl ImageEncoder for LocalClipService {
    fn descriptor(&self) -> EncoderDescriptor {
        EncoderDescriptor {
            provider: ClipProvider::Local,
            model: self.cfg.model.clone(),
            device: "cpu".into(),
            dim: self.cfg.dim,
        }
    }

    async fn encode(&self, image: &[u8]) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let bytes = image.to_vec();

        let mut out =
            tokio::task::spawn_blocking(move || model.embed_bytes(&[bytes.as_slice()], None))
                .await
                .map_err(|e| ProviderError::Inference(format!("inference task panicked: {e}")))?
                .map_err(|e| ProviderError::Inference(e.to_string()))?;

        let raw = out.pop().ok_or(ProviderError::EmptyData)?;
        debug!(dim = raw.len(), "local image embedding completed");
        finalize_embedding(raw, self.cfg.dim)
    }
}
