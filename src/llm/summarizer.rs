//! Question-focused summaries of retrieved fragments.

use std::sync::Arc;

use super::{LanguageModel, LlmError};

/// Stuffs all fragments into one prompt and asks for a concise,
/// question-oriented summary.
#[derive(Debug, Clone)]
pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn summarize(&self, fragments: &[String], question: &str) -> Result<String, LlmError> {
        let prompt = summary_prompt(fragments, question);
        self.model.generate(&prompt).await
    }
}

pub fn summary_prompt(fragments: &[String], question: &str) -> String {
    format!(
        "Write a concise summary of the following:\n\
         \"{}\".\n\n\
         Summary should give an answer to the question: \"{}\".\n\n\
         CONCISE SUMMARY:",
        fragments.join("\n\n"),
        question
    )
}
