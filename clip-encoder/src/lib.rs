//! CLIP image encoders for character matching.
//!
//! Public API:
//! - [`config_from_env`]: read `CLIP_*` variables into a [`ClipModelConfig`].
//! - [`load_encoder`]: construct the configured [`ImageEncoder`].
//! - [`image_data`]: decode uploaded base64 / data-URL payloads.
//! - [`health_service::HealthService`]: probe the backend.

pub mod config;
mod encoder;
pub mod error_handler;
pub mod health_service;
pub mod image_data;
pub mod services;

pub use config::clip_model_config::ClipModelConfig;
pub use config::clip_provider::ClipProvider;
pub use config::default_config::{config_from_env, config_from_lookup};
pub use encoder::{EncoderDescriptor, ImageEncoder, l2_normalize, load_encoder};
pub use error_handler::{ClipError, Result};
