#[cfg(feature = "local")]
pub mod local_clip_service;
pub mod remote_clip_service;
