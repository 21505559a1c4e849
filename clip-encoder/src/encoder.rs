use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    config::{clip_model_config::ClipModelConfig, clip_provider::ClipProvider},
    error_handler::{ProviderError, Result},
};

/// What is running inference, for health output and logs.
#[derive(Debug, Clone, Serialize)]
pub struct EncoderDescriptor {
    pub provider: ClipProvider,
    pub model: String,
    /// `"remote"` for HTTP backends, `"cpu"` for in-process ONNX.
    pub device: String,
    pub dim: usize,
}

/// Image → embedding seam used by the index and the HTTP layer.
///
/// Implementations return **L2-normalized** vectors of length `descriptor().dim`.
#[async_trait]
pub trait ImageEncoder: Send + Sync {
    fn descriptor(&self) -> EncoderDescriptor;

    async fn encode(&self, image: &[u8]) -> Result<Vec<f32>>;
}

/// Builds the encoder named by `cfg.provider`.
///
/// # Errors
/// - [`crate::error_handler::ConfigError::UnsupportedProvider`] for `Local` without the `local` feature
/// - provider construction errors
pub async fn load_encoder(cfg: &ClipModelConfig) -> Result<Arc<dyn ImageEncoder>> {
    match cfg.provider {
        ClipProvider::Remote => {
            let svc = crate::services::remote_clip_service::RemoteClipService::new(cfg.clone())?;
            Ok(Arc::new(svc))
        }
        #[cfg(feature = "local")]
        ClipProvider::Local => {
            let svc =
                crate::services::local_clip_service::LocalClipService::load(cfg.clone()).await?;
            Ok(Arc::new(svc))
        }
        #[cfg(not(feature = "local"))]
        ClipProvider::Local => Err(crate::error_handler::ConfigError::UnsupportedProvider(
            "local (built without the `local` feature)".into(),
        )
        .into()),
    }
}

/// Divides by the Euclidean norm; zero vectors are returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return v.to_vec();
    }
    v.iter().map(|x| x / norm).collect()
}

/// Checks dimension and finiteness, then normalizes.
pub(crate) fn finalize_embedding(raw: Vec<f32>, expected_dim: usize) -> Result<Vec<f32>> {
    if raw.len() != expected_dim {
        return Err(ProviderError::Dimension {
            expected: expected_dim,
            actual: raw.len(),
        }
        .into());
    }
    if raw.iter().any(|x| !x.is_finite()) {
        return Err(ProviderError::NonFinite.into());
    }
    Ok(l2_normalize(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::ClipError;

    #[test]
    fn normalizes_to_unit_length() {
        let v = l2_normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn finalize_rejects_wrong_dim_and_nan() {
        assert!(matches!(
            finalize_embedding(vec![1.0; 3], 4),
            Err(ClipError::Provider(ProviderError::Dimension {
                expected: 4,
                actual: 3
            }))
        ));
        assert!(matches!(
            finalize_embedding(vec![1.0, f32::NAN], 2),
            Err(ClipError::Provider(ProviderError::NonFinite))
        ));
    }

    #[tokio::test]
    async fn remote_provider_loads_without_network() {
        let cfg = crate::config::default_config::config_from_lookup(|_| None).unwrap();
        let enc = load_encoder(&cfg).await.unwrap();
        let d = enc.descriptor();
        assert_eq!(d.provider, ClipProvider::Remote);
        assert_eq!(d.dim, 512);
    }
}
