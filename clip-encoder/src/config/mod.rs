pub mod clip_model_config;
pub mod clip_provider;
pub mod default_config;
