//! Paper acquisition: deciding whether a link is directly downloadable,
//! fetching PDFs, and falling back to a mirror service.
//!
//! Every outcome is an explicit `Result<PathBuf, DownloadError>`, so callers
//! can tell "this link is an HTML landing page" apart from "the network failed".

pub mod mirror;

use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::PaperRecord;
use crate::utils::HttpClient;

pub use mirror::{MirrorDownloader, SciHubMirror};

/// Why a paper could not be downloaded
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The paper has no usable link
    #[error("No link to download")]
    NoLink,

    /// The URL serves text or HTML rather than a binary document
    #[error("Not a downloadable resource: {url} (content type {content_type:?})")]
    NotDownloadable {
        url: String,
        content_type: Option<String>,
    },

    /// The server answered with a non-success status
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// The mirror service produced no file for this locator
    #[error("Mirror has no file for {0}")]
    MirrorNotFound(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Whether trying again later could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Network(_) => true,
            DownloadError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DownloadError {
    fn from(err: reqwest::Error) -> Self {
        DownloadError::Network(err.to_string())
    }
}

/// The content-type rule: anything declared as text or HTML is a page, not a file.
/// A missing header is treated as not downloadable.
pub fn is_binary_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        Some(value) => {
            let value = value.to_lowercase();
            !value.contains("text") && !value.contains("html")
        }
        None => false,
    }
}

/// HEAD `url` and return its declared content type, if any.
pub async fn content_type_of(
    client: &HttpClient,
    url: &str,
) -> Result<Option<String>, DownloadError> {
    let response = client.head(url).send().await?;

    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::debug!("HEAD {} -> {:?}", url, content_type);
    Ok(content_type)
}

/// Check with a HEAD request whether `url` points directly at a binary resource.
pub async fn is_downloadable(client: &HttpClient, url: &str) -> Result<bool, DownloadError> {
    let content_type = content_type_of(client, url).await?;
    Ok(is_binary_content_type(content_type.as_deref()))
}

/// Download `url` into `directory` under a fresh `<uuid>.pdf` name.
pub async fn download_to(
    client: &HttpClient,
    url: &str,
    directory: &Path,
) -> Result<PathBuf, DownloadError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let bytes = response.bytes().await?;
    write_unique(directory, &bytes).await
}

/// Write bytes to a new uniquely named PDF file in `directory`.
pub(crate) async fn write_unique(directory: &Path, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
    tokio::fs::create_dir_all(directory).await?;
    let path = directory.join(format!("{}.pdf", uuid::Uuid::new_v4()));
    tokio::fs::write(&path, bytes).await?;
    tracing::debug!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

/// Resolves a paper record to a local PDF file.
#[derive(Debug, Clone)]
pub struct PaperFetcher {
    client: HttpClient,
    directory: PathBuf,
    mirror: Arc<dyn MirrorDownloader>,
}

impl PaperFetcher {
    pub fn new(
        client: HttpClient,
        directory: impl Into<PathBuf>,
        mirror: Arc<dyn MirrorDownloader>,
    ) -> Self {
        Self {
            client,
            directory: directory.into(),
            mirror,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Find a local copy of the paper.
    ///
    /// Tries the direct resource link, then the primary link, then the mirror
    /// keyed by the primary link. Each step that fails falls through to the
    /// next; the error of the last attempted step is returned.
    pub async fn resolve(&self, record: &PaperRecord) -> Result<PathBuf, DownloadError> {
        let mut last_error = DownloadError::NoLink;

        if !record.resource_link.is_empty() {
            match self.download_if_binary(&record.resource_link).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    tracing::debug!("Resource link unusable for '{}': {}", record.title, e);
                    last_error = e;
                }
            }
        }

        if record.link.is_empty() {
            return Err(last_error);
        }

        match self.download_if_binary(&record.link).await {
            Ok(path) => return Ok(path),
            Err(e) => tracing::debug!("Primary link unusable for '{}': {}", record.title, e),
        }

        let locator = mirror::locator_for(&record.link);
        self.mirror.fetch(&locator).await.inspect_err(|e| {
            tracing::debug!("Mirror download failed for '{}': {}", record.title, e)
        })
    }

    async fn download_if_binary(&self, url: &str) -> Result<PathBuf, DownloadError> {
        let content_type = content_type_of(&self.client, url).await?;
        if is_binary_content_type(content_type.as_deref()) {
            download_to(&self.client, url, &self.directory).await
        } else {
            Err(DownloadError::NotDownloadable {
                url: url.to_string(),
                content_type,
            })
        }
    }
}
