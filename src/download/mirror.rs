//! Mirror download service.
//!
//! A mirror is a secondary, non-publisher source that serves a paper's PDF
//! given a DOI-style locator. The Sci-Hub style mirror answers either with the
//! PDF itself or with an HTML page embedding it.

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use std::path::PathBuf;
use std::sync::OnceLock;
use url::Url;

use super::{download_to, is_binary_content_type, write_unique, DownloadError};
use crate::utils::HttpClient;

/// Elements that carry the embedded PDF on a mirror landing page
const PDF_SELECTORS: &[&str] = &[
    "embed#pdf",
    "iframe#pdf",
    "#pdf embed",
    "#pdf iframe",
    "embed[type=\"application/pdf\"]",
];

/// Fetches a paper by locator from a mirror service
#[async_trait]
pub trait MirrorDownloader: Send + Sync + std::fmt::Debug {
    /// Download the paper identified by `locator` and return the local path.
    async fn fetch(&self, locator: &str) -> Result<PathBuf, DownloadError>;
}

/// Sci-Hub style mirror
#[derive(Debug, Clone)]
pub struct SciHubMirror {
    client: HttpClient,
    base_url: String,
    directory: PathBuf,
}

impl SciHubMirror {
    pub fn new(client: HttpClient, base_url: &str, directory: impl Into<PathBuf>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            directory: directory.into(),
        }
    }
}

#[async_trait]
impl MirrorDownloader for SciHubMirror {
    async fn fetch(&self, locator: &str) -> Result<PathBuf, DownloadError> {
        let page_url = format!("{}/{}", self.base_url, locator);
        tracing::debug!("Requesting mirror copy: {}", page_url);

        let response = self.client.get(&page_url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DownloadError::MirrorNotFound(locator.to_string()));
        }
        if !response.status().is_success() {
            return Err(DownloadError::Status {
                url: page_url,
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let path = if is_binary_content_type(content_type.as_deref()) {
            let bytes = response.bytes().await?;
            write_unique(&self.directory, &bytes).await?
        } else {
            let html = response.text().await?;
            let src = find_pdf_src(&html)
                .ok_or_else(|| DownloadError::MirrorNotFound(locator.to_string()))?;
            let pdf_url = resolve_src(&page_url, &src)
                .ok_or_else(|| DownloadError::MirrorNotFound(locator.to_string()))?;
            download_to(&self.client, &pdf_url, &self.directory).await?
        };

        ensure_materialized(path, locator).await
    }
}

/// The file must exist and be non-empty to count as a download
async fn ensure_materialized(path: PathBuf, locator: &str) -> Result<PathBuf, DownloadError> {
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.len() > 0 => Ok(path),
        _ => {
            let _ = tokio::fs::remove_file(&path).await;
            Err(DownloadError::MirrorNotFound(locator.to_string()))
        }
    }
}

/// Locate the embedded PDF's `src` on a mirror page
pub fn find_pdf_src(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    PDF_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .filter_map(|el| el.value().attr("src"))
                .map(str::trim)
                .find(|src| !src.is_empty())
                .map(str::to_string)
        })
}

/// Resolve an embed `src` against the page it came from, dropping the
/// viewer fragment (`#view=FitH` and the like).
fn resolve_src(page_url: &str, src: &str) -> Option<String> {
    let src = src.split('#').next().unwrap_or(src);
    let base = Url::parse(page_url).ok()?;
    base.join(src).ok().map(String::from)
}

fn doi_pattern() -> &'static Regex {
    static DOI: OnceLock<Regex> = OnceLock::new();
    DOI.get_or_init(|| Regex::new(r"10\.\d{4,9}/[^\s?#&]+").expect("valid DOI pattern"))
}

/// The mirror locator for a paper link: its DOI when the link contains one,
/// otherwise the link itself.
pub fn locator_for(link: &str) -> String {
    doi_pattern()
        .find(link)
        .map(|m| m.as_str().trim_end_matches(['.', '/']).to_string())
        .unwrap_or_else(|| link.to_string())
}
