use crate::heuristics::Heuristics;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("empty entry in {0}: {1:?}")]
    EmptyEntry(&'static str, String),

    #[error("domain suffix must start with '.': {0}")]
    InvalidDomainSuffix(String),

    #[error("spec marker cannot be empty")]
    EmptySpecMarker,

    #[error("token length limits must be positive")]
    ZeroTokenLength,

    #[error("page size cannot be 0")]
    InvalidPageSize,

    #[error("output path cannot be empty")]
    EmptyOutput,
}

/// Where approved content records are read from
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum ContentSourceConfig {
    /// Paginated export API of the content application
    Api { url: Url, page_size: Option<u32> },
    /// JSON export on disk
    File { path: PathBuf },
}

/// Map generator configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub source: ContentSourceConfig,
    /// Artifact path. Replaced atomically on every successful run.
    pub output: PathBuf,
    #[serde(default)]
    pub heuristics: Heuristics,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let ContentSourceConfig::Api {
            page_size: Some(0), ..
        } = self.source
        {
            return Err(ValidationError::InvalidPageSize);
        }

        if self.output.as_os_str().is_empty() {
            return Err(ValidationError::EmptyOutput);
        }

        self.heuristics.validate()
    }
}
