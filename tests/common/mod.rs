//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use research_crew::download::{PaperFetcher, SciHubMirror};
use research_crew::llm::{ChatMessage, Completion, LanguageModel, LlmError, Summarizer, ToolSpec};
use research_crew::rag::{EmbeddingError, EmbeddingProvider, TextChunker, TiktokenTokenizer};
use research_crew::research::PaperPipeline;
use research_crew::utils::HttpClient;

/// A one-page PDF whose page shows `text` in Courier.
pub fn pdf_bytes(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save pdf");
    bytes
}

/// Letter-frequency vectors; similar spelling means similar meaning
#[derive(Debug, Default)]
pub struct LetterEmbedding {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for LetterEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0; 26];
                for c in t.to_lowercase().chars().filter(char::is_ascii_lowercase) {
                    v[(c as u8 - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "letters"
    }
}

/// Always gives the same answer and remembers the prompts it saw
#[derive(Debug)]
pub struct FixedModel {
    pub answer: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FixedModel {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LanguageModel for FixedModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<Completion, LlmError> {
        let prompt = messages
            .last()
            .and_then(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);
        Ok(Completion {
            content: Some(self.answer.clone()),
            tool_calls: Vec::new(),
        })
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

/// Pipeline downloading from `server_url` (also the mirror) into `dir`
pub fn pipeline(
    server_url: &str,
    dir: &Path,
    embedder: Arc<LetterEmbedding>,
    model: Arc<FixedModel>,
) -> PaperPipeline {
    let client = HttpClient::new().expect("http client");
    let mirror = SciHubMirror::new(client.clone(), server_url, dir);
    let fetcher = PaperFetcher::new(client, dir, Arc::new(mirror));
    let chunker = TextChunker::new(
        200,
        50,
        Arc::new(TiktokenTokenizer::cl100k().expect("cl100k tokenizer")),
    )
    .expect("chunker");

    PaperPipeline::new(fetcher, chunker, embedder, Summarizer::new(model))
}
