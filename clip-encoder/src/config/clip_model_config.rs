use crate::config::clip_provider::ClipProvider;

/// Configuration for a CLIP image encoder.
///
/// # Fields
///
/// - `provider`: which backend runs inference.
/// - `model`: model identifier understood by the backend
///   (e.g. `"openai/clip-vit-base-patch32"`).
/// - `endpoint`: base URL of the remote embeddings server (ignored by `Local`).
/// - `api_key`: optional bearer token for the remote server.
/// - `dim`: expected embedding dimensionality (512 for ViT-B/32).
/// - `timeout_secs`: request timeout for remote calls.
#[derive(Debug, Clone)]
pub struct ClipModelConfig {
    pub provider: ClipProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub dim: usize,
    pub timeout_secs: u64,
}
