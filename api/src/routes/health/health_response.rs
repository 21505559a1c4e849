use clip_encoder::ClipProvider;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub model_loaded: bool,
    /// `cpu`, `remote`, or `unavailable` before warmup.
    pub model_device: String,
    pub model_name: String,
    pub provider: ClipProvider,
    pub characters_count: u64,
    pub vector_store_ok: bool,
    /// Live `/models` probe of the configured backend (always ok for local).
    pub encoder_ok: bool,
    pub encoder_message: String,
    pub encoder_latency_ms: u128,
}
