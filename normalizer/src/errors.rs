use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] crate::config::ValidationError),

    #[error("redirect map unavailable: {0}")]
    RedirectMap(#[from] redirect_map::artifact::ArtifactError),

    #[error("failed to build response: {0}")]
    Http(#[from] http::Error),

    #[error("Upstream request failed for {0}: {1}")]
    UpstreamRequestFailed(String, String),

    #[error("Upstream timeout for {0}")]
    UpstreamTimeout(String),

    #[error("Failed to read response body: {0}")]
    ResponseBodyError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
