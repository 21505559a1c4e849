use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error_handler::ConfigError;

/// Backend used to turn an image into a CLIP embedding.
///
/// - `Remote`: an OpenAI-compatible embeddings server hosting a CLIP model.
/// - `Local`: in-process ONNX inference (requires the `local` cargo feature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipProvider {
    Remote,
    Local,
}

impl ClipProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipProvider::Remote => "remote",
            ClipProvider::Local => "local",
        }
    }
}

impl fmt::Display for ClipProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClipProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" | "http" | "openai" => Ok(ClipProvider::Remote),
            "local" | "onnx" | "fastembed" => Ok(ClipProvider::Local),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
