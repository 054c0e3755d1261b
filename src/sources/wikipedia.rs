//! Wikipedia lookups for general background knowledge.

use serde::Deserialize;
use std::collections::HashMap;

use crate::config::Config;
use crate::sources::SourceError;
use crate::utils::HttpClient;

/// Answer when the search matched no page
pub const NO_WIKIPEDIA_RESULT: &str = "No good Wikipedia Search Result was found";

const TOP_K_RESULTS: usize = 3;

/// MediaWiki search returning the intro of the best matching pages
#[derive(Debug, Clone)]
pub struct WikipediaSource {
    client: HttpClient,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryPages>,
}

#[derive(Debug, Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    index: usize,
    #[serde(default)]
    extract: String,
}

impl WikipediaSource {
    pub fn new(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config, client: HttpClient) -> Self {
        Self::new(client, &config.endpoints.wikipedia_base)
    }

    /// Look `query` up and format the top pages as
    /// `Page: <title>\nSummary: <extract>` blocks.
    pub async fn lookup(&self, query: &str) -> Result<String, SourceError> {
        tracing::debug!("Wikipedia lookup for '{}'", query);

        let limit = TOP_K_RESULTS.to_string();
        let response = self
            .client
            .get(&format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Wikipedia returned status: {}",
                response.status()
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        Ok(format_pages(body))
    }
}

fn format_pages(body: QueryResponse) -> String {
    let mut pages: Vec<Page> = body
        .query
        .map(|q| q.pages.into_values().collect())
        .unwrap_or_default();
    pages.sort_by_key(|page| page.index);

    let summaries: Vec<String> = pages
        .into_iter()
        .filter(|page| !page.extract.trim().is_empty())
        .take(TOP_K_RESULTS)
        .map(|page| format!("Page: {}\nSummary: {}", page.title, page.extract.trim()))
        .collect();

    if summaries.is_empty() {
        NO_WIKIPEDIA_RESULT.to_string()
    } else {
        summaries.join("\n\n")
    }
}
