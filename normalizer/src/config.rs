use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener cannot share {0}:{1}")]
    SharedListener(String, u16),

    #[error("Upstream must be an http URL, got: {0}")]
    UnsupportedUpstream(Url),

    #[error("Upstream timeout cannot be 0")]
    InvalidTimeout,
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

/// Normalizer configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Public listener that receives site traffic
    pub listener: Listener,
    /// Listener for health and readiness probes
    pub admin_listener: Listener,
    /// Content application that serves everything not redirected
    pub upstream: Url,
    /// Artifact produced by the map generator
    pub redirect_map: PathBuf,
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::SharedListener(
                self.listener.host.clone(),
                self.listener.port,
            ));
        }

        // The upstream client only speaks plain http
        if self.upstream.scheme() != "http" || self.upstream.host_str().is_none() {
            return Err(ValidationError::UnsupportedUpstream(self.upstream.clone()));
        }

        if self.upstream_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}
