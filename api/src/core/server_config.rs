use thiserror::Error;

const DEFAULT_PORT: &str = "8080";
const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

/// Listener settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `host:port` to bind.
    pub address: String,
    /// Request body cap; uploads arrive base64-encoded inside JSON.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// `API_ADDRESS` wins; otherwise `0.0.0.0:{PORT}` with `PORT` defaulting to 8080.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = match lookup("API_ADDRESS") {
            Some(addr) => addr,
            None => {
                let port = lookup("PORT").unwrap_or_else(|| DEFAULT_PORT.into());
                port.trim()
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidNumber {
                        var: "PORT",
                        value: port.clone(),
                    })?;
                format!("0.0.0.0:{}", port.trim())
            }
        };

        let max_body_bytes = match lookup("API_MAX_BODY_BYTES") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "API_MAX_BODY_BYTES",
                    value: v,
                })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        Ok(Self {
            address,
            max_body_bytes,
        })
    }
}
