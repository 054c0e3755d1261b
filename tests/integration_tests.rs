//! Integration tests for the research pipeline.
//!
//! External services (SerpAPI, publishers, the mirror, OpenAI, Wikipedia)
//! are replaced by a local mockito server.

mod common;

use std::io::Write;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use mockito::Matcher;
use serde_json::json;
use tempfile::tempdir;
use tracing_subscriber::fmt::MakeWriter;

use common::{pdf_bytes, pipeline, FixedModel, LetterEmbedding};
use research_crew::llm::{ChatMessage, LanguageModel, OpenAIChat, ToolSpec};
use research_crew::mcp::{ToolRegistry, READ_TOOL, SEARCH_TOOL, WIKIPEDIA_TOOL};
use research_crew::models::PaperRecord;
use research_crew::rag::{EmbeddingProvider, OpenAIEmbedding};
use research_crew::research::{read_papers, search_and_save, ResearchContext, NOTHING_FOUND};
use research_crew::sources::{GoogleScholarSource, WikipediaSource};
use research_crew::utils::{extract_text, HttpClient};

const PAPER_TEXT: &str = "Fried meat contains heterocyclic amines linked to cancer risk.";

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn scholar(server: &mockito::ServerGuard) -> GoogleScholarSource {
    GoogleScholarSource::new(
        HttpClient::new().unwrap(),
        &server.url(),
        Some("test-key".to_string()),
    )
}

fn organic_result(title: &str, resource: Option<(&str, &str)>) -> serde_json::Value {
    let mut value = json!({
        "title": title,
        "link": format!("https://example.org/{}", title.to_lowercase().replace(' ', "-")),
        "publication_info": {
            "summary": "A Author, B Author - Journal of Tests, 2020 - example.org",
            "authors": [{"name": "A Author"}, {"name": "B Author"}]
        },
        "type": "Pdf"
    });
    if let Some((format, link)) = resource {
        value["resources"] = json!([{"title": "example.org", "file_format": format, "link": link}]);
    }
    value
}

#[tokio::test]
async fn test_search_without_organic_results_logs_payload() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Google hasn't returned any results for this query."}"#)
        .create_async()
        .await;

    let mut ctx = ResearchContext::new();
    let added = search_and_save(&mut ctx, &scholar(&server), "nothing at all")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(added, 0);
    assert!(ctx.is_empty());
    assert!(logs
        .contents()
        .contains(r#"{"error":"Google hasn't returned any results for this query."}"#));
}

#[tokio::test]
async fn test_search_and_save_appends_parsed_results() {
    let mut server = mockito::Server::new_async().await;
    let body = json!({
        "search_metadata": {"status": "Success"},
        "organic_results": [
            organic_result("Fried Meat", Some(("PDF", "https://example.org/fried.pdf"))),
            organic_result("Alcohol Harm", Some(("HTML", "https://example.org/alcohol"))),
            organic_result("Steak Study", None),
        ]
    });
    let mock = server
        .mock("GET", "/search.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("engine".into(), "google_scholar".into()),
            Matcher::UrlEncoded("q".into(), "harm of fried meat".into()),
            Matcher::UrlEncoded("api_key".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let mut ctx = ResearchContext::new();
    search_and_save(&mut ctx, &scholar(&server), "harm of fried meat")
        .await
        .unwrap();
    mock.assert_async().await;

    let records: Vec<&PaperRecord> = ctx.results().iter().map(|r| r.record()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].resource_link, "https://example.org/fried.pdf");
    assert_eq!(records[0].authors, "A Author, B Author");
    assert_eq!(records[1].resource_link, "");
    assert_eq!(records[2].resource_link, "");
    assert_eq!(records[2].format.as_deref(), Some("Pdf"));
}

#[tokio::test]
async fn test_search_api_error_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search.json")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let mut ctx = ResearchContext::new();
    assert!(search_and_save(&mut ctx, &scholar(&server), "q").await.is_err());
    assert!(ctx.is_empty());
}

#[tokio::test]
async fn test_read_papers_with_empty_registry() {
    let dir = tempdir().unwrap();
    let pipeline = pipeline(
        "http://127.0.0.1:9",
        dir.path(),
        Arc::new(LetterEmbedding::default()),
        Arc::new(FixedModel::new("unused")),
    );

    let answer = read_papers(&ResearchContext::new(), &pipeline, "Is alcohol harmful?")
        .await
        .unwrap();
    assert_eq!(answer, NOTHING_FOUND);
}

#[tokio::test]
async fn test_read_papers_when_every_strategy_fails() {
    let mut server = mockito::Server::new_async().await;
    let resource_head = server
        .mock("HEAD", "/files/paper.pdf")
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .expect(1)
        .create_async()
        .await;
    let link_head = server
        .mock("HEAD", "/doi/10.1000/xyz123")
        .with_status(200)
        .with_header("content-type", "text/html")
        .expect(1)
        .create_async()
        .await;
    let mirror_page = server
        .mock("GET", "/10.1000/xyz123")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body><p>article not found</p></body></html>")
        .expect(1)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let model = Arc::new(FixedModel::new("unused"));
    let pipeline = pipeline(
        &server.url(),
        dir.path(),
        Arc::new(LetterEmbedding::default()),
        model.clone(),
    );

    let mut ctx = ResearchContext::new();
    ctx.push(PaperRecord {
        title: "Unreachable".to_string(),
        link: format!("{}/doi/10.1000/xyz123", server.url()),
        resource_link: format!("{}/files/paper.pdf", server.url()),
        ..Default::default()
    });

    let answer = read_papers(&ctx, &pipeline, "Is alcohol harmful?").await.unwrap();

    assert_eq!(answer, NOTHING_FOUND);
    resource_head.assert_async().await;
    link_head.assert_async().await;
    mirror_page.assert_async().await;
    assert!(model.prompts.lock().unwrap().is_empty());
    assert!(ctx.results()[0].text_resolved());
}

#[tokio::test]
async fn test_read_papers_end_to_end_downloads_once() {
    let mut server = mockito::Server::new_async().await;
    let head = server
        .mock("HEAD", "/files/fried.pdf")
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .expect(1)
        .create_async()
        .await;
    let get = server
        .mock("GET", "/files/fried.pdf")
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .with_body(pdf_bytes(PAPER_TEXT))
        .expect(1)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let embedder = Arc::new(LetterEmbedding::default());
    let model = Arc::new(FixedModel::new("Fried meat raises cancer risk."));
    let pipeline = pipeline(&server.url(), dir.path(), embedder.clone(), model.clone());

    let mut ctx = ResearchContext::new();
    ctx.push(PaperRecord {
        title: "Fried meat and cancer".to_string(),
        link: "https://example.org/landing".to_string(),
        resource_link: format!("{}/files/fried.pdf", server.url()),
        summary: "A Author - Journal of Tests, 2020".to_string(),
        ..Default::default()
    });

    let expected = "\"Fried meat and cancer\". A Author - Journal of Tests, 2020\n\nSummary: Fried meat raises cancer risk.";

    let first = read_papers(&ctx, &pipeline, "Is fried meat harmful?").await.unwrap();
    assert_eq!(first, expected);

    let second = read_papers(&ctx, &pipeline, "Is fried meat carcinogenic?").await.unwrap();
    assert_eq!(second, expected);

    head.assert_async().await;
    get.assert_async().await;

    // One batch to build the index, one query embedding per question
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);

    let prompts = model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("heterocyclic amines"));
    assert!(prompts[0].contains("Summary should give an answer to the question: \"Is fried meat harmful?\"."));
    assert!(prompts[0].ends_with("CONCISE SUMMARY:"));
}

#[tokio::test]
async fn test_read_papers_skips_papers_without_text() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/files/good.pdf")
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .create_async()
        .await;
    server
        .mock("GET", "/files/good.pdf")
        .with_status(200)
        .with_body(pdf_bytes(PAPER_TEXT))
        .create_async()
        .await;
    server
        .mock("HEAD", "/landing/bad")
        .with_status(200)
        .with_header("content-type", "text/html")
        .create_async()
        .await;
    server
        .mock("GET", Matcher::Regex(r"^/http".to_string()))
        .with_status(404)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let pipeline = pipeline(
        &server.url(),
        dir.path(),
        Arc::new(LetterEmbedding::default()),
        Arc::new(FixedModel::new("It is harmful.")),
    );

    let mut ctx = ResearchContext::new();
    ctx.push(PaperRecord {
        title: "Bad".to_string(),
        link: format!("{}/landing/bad", server.url()),
        ..Default::default()
    });
    ctx.push(PaperRecord {
        title: "Good".to_string(),
        link: "https://example.org/good".to_string(),
        resource_link: format!("{}/files/good.pdf", server.url()),
        summary: "Journal".to_string(),
        ..Default::default()
    });

    let answer = read_papers(&ctx, &pipeline, "Is it harmful?").await.unwrap();
    assert_eq!(answer, "\"Good\". Journal\n\nSummary: It is harmful.");
}

#[tokio::test]
async fn test_mirror_fallback_follows_embedded_pdf() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("HEAD", "/doi/10.1000/abc")
        .with_status(200)
        .with_header("content-type", "text/html")
        .create_async()
        .await;
    server
        .mock("GET", "/10.1000/abc")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(r#"<html><body><div id="article"><embed type="application/pdf" src="/downloads/abc.pdf#navpanes=0&view=FitH" id="pdf"></div></body></html>"#)
        .create_async()
        .await;
    let pdf = server
        .mock("GET", "/downloads/abc.pdf")
        .with_status(200)
        .with_header("content-type", "application/pdf")
        .with_body(pdf_bytes(PAPER_TEXT))
        .expect(1)
        .create_async()
        .await;

    let dir = tempdir().unwrap();
    let pipeline = pipeline(
        &server.url(),
        dir.path(),
        Arc::new(LetterEmbedding::default()),
        Arc::new(FixedModel::new("Yes.")),
    );

    let record = PaperRecord {
        title: "Mirrored".to_string(),
        link: format!("{}/doi/10.1000/abc", server.url()),
        ..Default::default()
    };
    let path = pipeline.fetcher().resolve(&record).await.unwrap();

    pdf.assert_async().await;
    assert!(path.starts_with(dir.path()));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));

    let text = extract_text(&path, 20_000).unwrap();
    assert!(text.contains("heterocyclic amines"));
}

#[test]
fn test_extract_text_truncates_pages() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("paper.pdf");
    std::fs::write(&path, pdf_bytes(PAPER_TEXT)).unwrap();

    let full = extract_text(&path, 20_000).unwrap();
    assert!(full.starts_with(' '));
    assert!(full.contains("Fried meat contains"));

    let short = extract_text(&path, 10).unwrap();
    assert!(short.starts_with(" Fried"));
    assert!(short.chars().count() < full.chars().count());
}

#[tokio::test]
async fn test_tool_registry_exposes_research_tools() {
    let server = mockito::Server::new_async().await;
    let dir = tempdir().unwrap();
    let client = HttpClient::new().unwrap();
    let registry = ToolRegistry::research_tools(
        Arc::new(scholar(&server)),
        Arc::new(WikipediaSource::new(client, &server.url())),
        Arc::new(pipeline(
            &server.url(),
            dir.path(),
            Arc::new(LetterEmbedding::default()),
            Arc::new(FixedModel::new("unused")),
        )),
    );

    let names: Vec<&str> = registry.all().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec![READ_TOOL, SEARCH_TOOL, WIKIPEDIA_TOOL]);

    for (tool, param) in [(SEARCH_TOOL, "query"), (READ_TOOL, "question"), (WIKIPEDIA_TOOL, "query")] {
        let schema = &registry.get(tool).unwrap().input_schema;
        assert_eq!(schema["required"], json!([param]));
        assert_eq!(schema["properties"][param]["type"], "string");
    }
}

#[tokio::test]
async fn test_tools_share_the_research_context() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/search.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(json!({"organic_results": [organic_result("Alcohol Harm", None)]}).to_string())
        .create_async()
        .await;
    let dir = tempdir().unwrap();
    let registry = ToolRegistry::research_tools(
        Arc::new(scholar(&server)),
        Arc::new(WikipediaSource::new(HttpClient::new().unwrap(), &server.url())),
        Arc::new(pipeline(
            &server.url(),
            dir.path(),
            Arc::new(LetterEmbedding::default()),
            Arc::new(FixedModel::new("unused")),
        )),
    );

    let mut ctx = ResearchContext::new();
    let saved = registry
        .execute(SEARCH_TOOL, &mut ctx, json!({"query": "harm of alcohol"}))
        .await
        .unwrap();
    assert_eq!(saved, json!("Results found and saved in global context"));
    assert_eq!(ctx.len(), 1);

    let err = registry
        .execute(READ_TOOL, &mut ctx, json!({}))
        .await
        .unwrap_err();
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_wikipedia_lookup() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/w/api.php")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("generator".into(), "search".into()),
            Matcher::UrlEncoded("gsrsearch".into(), "alcohol".into()),
            Matcher::UrlEncoded("prop".into(), "extracts".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"query": {"pages": {
                "1": {"title": "Alcohol (drug)", "index": 1, "extract": "Alcohol is a depressant."}
            }}})
            .to_string(),
        )
        .create_async()
        .await;

    let wikipedia = WikipediaSource::new(HttpClient::new().unwrap(), &server.url());
    let answer = wikipedia.lookup("alcohol").await.unwrap();

    mock.assert_async().await;
    assert_eq!(answer, "Page: Alcohol (drug)\nSummary: Alcohol is a depressant.");
}

#[tokio::test]
async fn test_openai_embeddings_restore_input_order() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/embeddings")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({"model": "text-embedding-ada-002"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"object": "list", "data": [
                {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
            ]})
            .to_string(),
        )
        .create_async()
        .await;

    let embedder = OpenAIEmbedding::new(
        HttpClient::new().unwrap(),
        &server.url(),
        "text-embedding-ada-002",
        Some("sk-test".to_string()),
    );
    let vectors = embedder
        .embed_batch(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_openai_chat_parses_tool_calls() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"model": "gpt-4-1106-preview"})),
            Matcher::Regex(r#""tools":\[\{"type":"function""#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"choices": [{"index": 0, "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "read_papers", "arguments": "{\"question\":\"Is alcohol harmful?\"}"}
                }]
            }, "finish_reason": "tool_calls"}]})
            .to_string(),
        )
        .create_async()
        .await;

    let chat = OpenAIChat::new(
        HttpClient::new().unwrap(),
        &server.url(),
        "gpt-4-1106-preview",
        0.0,
        Some("sk-test".to_string()),
    );
    let tools = [ToolSpec {
        name: "read_papers".to_string(),
        description: "Read papers".to_string(),
        parameters: json!({"type": "object"}),
    }];
    let completion = chat
        .complete(&[ChatMessage::user("Which is more harmful?")], &tools)
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(completion.content.is_none());
    assert_eq!(completion.tool_calls.len(), 1);
    assert_eq!(completion.tool_calls[0].name, "read_papers");
    assert_eq!(
        completion.tool_calls[0].arguments,
        json!({"question": "Is alcohol harmful?"})
    );
}
