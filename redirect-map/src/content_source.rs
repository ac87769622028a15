//! Read-only access to approved content records.

const BASE_DELAY_MS: u64 = 500;
const MAX_RETRIES: u32 = 3;

use crate::types::{CanonicalRecord, ContentKind, ContentSnapshot};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::time::{Duration, sleep};
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("content API request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("content API unavailable after retries fetching {0}")]
    RetriesExceeded(ContentKind),
    #[error("content API returned {status} for {url}")]
    UnexpectedStatus { status: StatusCode, url: String },
    #[error("content API reported more {0} but returned no cursor")]
    MissingCursor(ContentKind),
    #[error("could not read content export {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse content export: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// All approved records of `kind`, in the order the store returns them.
    async fn fetch(&self, kind: ContentKind) -> Result<Vec<CanonicalRecord>, SourceError>;
}

#[derive(Deserialize)]
struct PageMetadata {
    cursor: Option<String>,
    has_more: bool,
}

#[derive(Deserialize)]
struct ContentPage {
    data: Vec<CanonicalRecord>,
    metadata: PageMetadata,
}

/// Client for the content application's paginated export API.
pub struct ContentApi {
    client: reqwest::Client,
    base_url: String,
    page_size: Option<u32>,
}

impl ContentApi {
    pub fn new(base_url: &Url, page_size: Option<u32>) -> Self {
        ContentApi {
            client: reqwest::Client::new(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            page_size,
        }
    }

    fn page_url(&self, kind: ContentKind, cursor: Option<&str>) -> Result<Url, SourceError> {
        let mut url = Url::parse(&format!(
            "{}/api/content/{}/",
            self.base_url,
            kind.path_segment()
        ))
        .map_err(|e| SourceError::InvalidUrl(e.to_string()))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("status", "approved");
            if let Some(size) = self.page_size {
                query.append_pair("per_page", &size.to_string());
            }
            if let Some(c) = cursor {
                query.append_pair("cursor", c);
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl ContentSource for ContentApi {
    async fn fetch(&self, kind: ContentKind) -> Result<Vec<CanonicalRecord>, SourceError> {
        const RETRIABLE_STATUS_CODES: &[StatusCode] = &[
            StatusCode::TOO_MANY_REQUESTS,     // 429
            StatusCode::INTERNAL_SERVER_ERROR, // 500
            StatusCode::BAD_GATEWAY,           // 502
            StatusCode::SERVICE_UNAVAILABLE,   // 503
            StatusCode::GATEWAY_TIMEOUT,       // 504
        ];

        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_fetches = 0;
        let mut retries = 0;

        loop {
            let url = self.page_url(kind, cursor.as_deref())?;
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();

            if !status.is_success() {
                if !RETRIABLE_STATUS_CODES.contains(&status) {
                    return Err(SourceError::UnexpectedStatus {
                        status,
                        url: url.to_string(),
                    });
                }
                if retries >= MAX_RETRIES {
                    return Err(SourceError::RetriesExceeded(kind));
                }

                let retry_millis = BASE_DELAY_MS * 2_u64.pow(retries);
                tracing::warn!(%kind, %status, retry_millis, "content API error, retrying");
                sleep(Duration::from_millis(retry_millis)).await;
                retries += 1;
                continue;
            }

            // Page succeeded, the retry budget applies per page
            retries = 0;

            let page = response.json::<ContentPage>().await?;
            records.extend(page.data);
            page_fetches += 1;

            if !page.metadata.has_more {
                break;
            }
            match page.metadata.cursor {
                Some(next) => cursor = Some(next),
                None => return Err(SourceError::MissingCursor(kind)),
            }
        }

        tracing::info!(%kind, page_fetches, records = records.len(), "fetched content");
        Ok(records)
    }
}

/// Reads records from a JSON export shaped like [`ContentSnapshot`].
pub struct FileContentSource {
    path: PathBuf,
}

impl FileContentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileContentSource { path: path.into() }
    }
}

#[async_trait]
impl ContentSource for FileContentSource {
    async fn fetch(&self, kind: ContentKind) -> Result<Vec<CanonicalRecord>, SourceError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;
        let snapshot: ContentSnapshot = serde_json::from_slice(&raw)?;
        Ok(snapshot.records(kind).to_vec())
    }
}
