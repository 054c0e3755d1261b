//! Token-window text chunking.
//!
//! Text is measured in language-model tokens. Chunks hold at most
//! `chunk_size` tokens and each chunk starts `chunk_size - chunk_overlap`
//! tokens after the previous one, so neighbours share exactly
//! `chunk_overlap` tokens and the windows cover the whole input.

use std::ops::Range;
use std::sync::Arc;

use super::RagError;

/// Converts text to and from token ids
pub trait Tokenizer: Send + Sync + std::fmt::Debug {
    fn encode(&self, text: &str) -> Vec<usize>;

    /// Text for any slice of an encoding. A slice that starts or ends inside
    /// a character still decodes to its whole characters.
    fn decode(&self, tokens: &[usize]) -> String;
}

/// OpenAI `cl100k_base` byte-pair encoding
pub struct TiktokenTokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

impl TiktokenTokenizer {
    pub fn cl100k() -> Result<Self, RagError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| RagError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl std::fmt::Debug for TiktokenTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenTokenizer")
            .field("encoding", &"cl100k_base")
            .finish()
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Vec<usize> {
        self.bpe
            .encode_ordinary(text)
            .into_iter()
            .map(|t| t as usize)
            .collect()
    }

    fn decode(&self, tokens: &[usize]) -> String {
        let ranks: Vec<tiktoken_rs::Rank> = tokens.iter().map(|&t| t as tiktoken_rs::Rank).collect();
        let bytes: Vec<u8> = self.bpe._decode_native_and_split(ranks).flatten().collect();
        let text = String::from_utf8_lossy(&bytes);

        // Window edges can cut a multi-byte character in half; only the
        // edges are lossy, the middle of the window decodes exactly.
        let trimmed = text.trim_matches(char::REPLACEMENT_CHARACTER);
        if trimmed.is_empty() {
            text.into_owned()
        } else {
            trimmed.to_string()
        }
    }
}

/// The token ranges covered by each chunk.
///
/// `step = size - overlap`; the last window ends exactly at `len`.
pub fn token_windows(len: usize, size: usize, overlap: usize) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    if len == 0 || size == 0 || overlap >= size {
        return windows;
    }

    let step = size - overlap;
    let mut start = 0;
    loop {
        let end = (start + size).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += step;
    }
    windows
}

/// Splits documents into overlapping token windows
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    tokenizer: Arc<dyn Tokenizer>,
}

impl TextChunker {
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, RagError> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(RagError::InvalidChunking {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            tokenizer,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenizer.encode(text);

        token_windows(tokens.len(), self.chunk_size, self.chunk_overlap)
            .into_iter()
            .filter_map(|window| {
                let chunk = self.tokenizer.decode(&tokens[window.clone()]);
                if chunk.trim().is_empty() {
                    tracing::debug!("Skipping blank chunk at tokens {:?}", window);
                    return None;
                }
                Some(chunk)
            })
            .collect()
    }
}
