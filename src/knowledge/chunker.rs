// file: src/knowledge/chunker.rs
// description: deterministic fixed-size text chunking for indexing
// reference: sentence-boundary packing over a character budget

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // sentence boundary: terminal punctuation followed by whitespace
    static ref SENTENCE_BOUNDARY: Regex = Regex::new(r"(?s)(.*?[.!?])(?:\s+|$)").unwrap();
}

/// Splits text into chunks of at most `chunk_size` characters. Paragraphs are
/// packed whole where they fit, longer paragraphs are split on sentence
/// boundaries, and a single over-long sentence is hard-split on char
/// boundaries. The output depends only on the input text and the chunk size.
pub struct TextChunker {
    chunk_size: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for paragraph in text.split("\n\n") {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }

            for piece in self.split_paragraph(paragraph) {
                let current_len = current.chars().count();
                let piece_len = piece.chars().count();

                if current_len > 0 && current_len + 1 + piece_len > self.chunk_size {
                    chunks.push(std::mem::take(&mut current));
                }

                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&piece);
            }
        }

        if !current.trim().is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// A paragraph that fits the budget stays intact; otherwise split it on
    /// sentence boundaries, hard-splitting any sentence that alone exceeds
    /// the budget.
    fn split_paragraph(&self, paragraph: &str) -> Vec<String> {
        if paragraph.chars().count() <= self.chunk_size {
            return vec![paragraph.to_string()];
        }

        let mut pieces = Vec::new();
        let mut consumed = 0;

        for captures in SENTENCE_BOUNDARY.captures_iter(paragraph) {
            let matched = captures.get(0).map(|m| m.end()).unwrap_or(0);
            let sentence = captures[1].trim().to_string();
            consumed = consumed.max(matched);

            if sentence.is_empty() {
                continue;
            }

            if sentence.chars().count() > self.chunk_size {
                pieces.extend(self.hard_split(&sentence));
            } else {
                pieces.push(sentence);
            }
        }

        // trailing text without terminal punctuation
        let tail = paragraph[consumed..].trim();
        if !tail.is_empty() {
            if tail.chars().count() > self.chunk_size {
                pieces.extend(self.hard_split(tail));
            } else {
                pieces.push(tail.to_string());
            }
        }

        pieces
    }

    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_size)
            .map(|c| c.iter().collect())
            .collect()
    }
}
