//! Google Scholar search through SerpAPI.
//!
//! Only the first result page is requested. Records are mapped to
//! [`PaperRecord`]s; a record without a title or link is skipped.

use serde::Deserialize;
use serde_json::Value;

use crate::config::{resolve_credential, Config, SERPAPI_API_KEY_VAR};
use crate::models::PaperRecord;
use crate::sources::SourceError;
use crate::utils::HttpClient;

/// Google Scholar research source
#[derive(Debug, Clone)]
pub struct GoogleScholarSource {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleScholarSource {
    pub fn new(client: HttpClient, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &Config, client: HttpClient) -> Self {
        Self::new(
            client,
            &config.endpoints.serpapi_base,
            config.api_keys.serpapi.clone(),
        )
    }

    /// Search Google Scholar.
    ///
    /// A response without `organic_results` is logged and yields no records.
    pub async fn search(&self, query: &str) -> Result<Vec<PaperRecord>, SourceError> {
        let api_key = resolve_credential(self.api_key.as_deref(), SERPAPI_API_KEY_VAR)?;

        tracing::info!("Searching Google Scholar for '{}'", query);

        let response = self
            .client
            .get(&format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google_scholar"),
                ("q", query),
                ("api_key", api_key.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(format!(
                "SerpAPI returned status {}: {}",
                status, text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to read response: {}", e)))?;

        let records = parse_response(&body);
        tracing::info!("Google Scholar returned {} results", records.len());
        Ok(records)
    }
}

/// Map a SerpAPI response body to records.
pub fn parse_response(body: &Value) -> Vec<PaperRecord> {
    let Some(results) = body.get("organic_results").and_then(Value::as_array) else {
        tracing::warn!(payload = %body, "Search response has no organic_results");
        return Vec::new();
    };

    results
        .iter()
        .filter_map(|result| match parse_record(result) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping search result: {}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    #[serde(default)]
    publication_info: PublicationInfo,
    #[serde(default)]
    resources: Vec<Resource>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PublicationInfo {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(default)]
    link: String,
    file_format: Option<String>,
}

/// Parse one `organic_results` record.
///
/// The resource link survives only when its declared format is exactly `PDF`.
pub fn parse_record(value: &Value) -> Result<PaperRecord, SourceError> {
    let result = OrganicResult::deserialize(value)?;

    let authors = result
        .publication_info
        .authors
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let resource_link = result
        .resources
        .into_iter()
        .next()
        .filter(|r| r.file_format.as_deref() == Some("PDF"))
        .map(|r| r.link)
        .unwrap_or_default();

    Ok(PaperRecord {
        title: result.title,
        link: result.link,
        resource_link,
        authors,
        format: result.kind,
        summary: result.publication_info.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> Value {
        json!({
            "position": 3,
            "title": "Decoding ability in French as a foreign language and language learning motivation",
            "result_id": "7tNLdwrTTTcJ",
            "link": "https://onlinelibrary.wiley.com/doi/abs/10.1111/j.1540-4781.2011.01238.x",
            "publication_info": {
                "summary": "L Erler, E Macaro - The Modern Language Journal, 2011 - Wiley Online Library"
            }
        })
    }

    #[test]
    fn test_parse_record_without_resources() {
        let record = parse_record(&sample_record()).unwrap();

        assert_eq!(
            record.title,
            "Decoding ability in French as a foreign language and language learning motivation"
        );
        assert_eq!(
            record.link,
            "https://onlinelibrary.wiley.com/doi/abs/10.1111/j.1540-4781.2011.01238.x"
        );
        assert_eq!(record.resource_link, "");
        assert_eq!(record.authors, "");
        assert_eq!(record.format, None);
        assert!(record.summary.starts_with("L Erler, E Macaro"));
    }

    #[test]
    fn test_parse_record_with_pdf_resource_and_authors() {
        let mut value = sample_record();
        value["resources"] = json!([{"title": "wiley.com", "file_format": "PDF", "link": "https://example.org/paper.pdf"}]);
        value["publication_info"]["authors"] = json!([{"name": "L Erler"}, {"name": "E Macaro"}]);
        value["type"] = json!("Pdf");

        let record = parse_record(&value).unwrap();
        assert_eq!(record.resource_link, "https://example.org/paper.pdf");
        assert_eq!(record.authors, "L Erler, E Macaro");
        assert_eq!(record.format.as_deref(), Some("Pdf"));
    }

    #[test]
    fn test_parse_record_discards_non_pdf_resource() {
        let mut value = sample_record();
        value["resources"] = json!([{"file_format": "HTML", "link": "https://example.org/paper"}]);
        assert_eq!(parse_record(&value).unwrap().resource_link, "");

        value["resources"] = json!([{"file_format": "pdf", "link": "https://example.org/paper.pdf"}]);
        assert_eq!(parse_record(&value).unwrap().resource_link, "");
    }

    #[test]
    fn test_parse_record_missing_summary() {
        let value = json!({"title": "T", "link": "https://example.org", "publication_info": {}});
        assert_eq!(parse_record(&value).unwrap().summary, "");
    }

    #[test]
    fn test_parse_record_requires_title_and_link() {
        assert!(parse_record(&json!({"link": "https://example.org"})).is_err());
        assert!(parse_record(&json!({"title": "T"})).is_err());
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "organic_results": [sample_record(), {"title": "no link"}, sample_record()]
        });
        assert_eq!(parse_response(&body).len(), 2);
        assert!(parse_response(&json!({"error": "Invalid API key"})).is_empty());
    }
}
