// file: src/models/answer.rs
// description: synthesized answer model returned by the query engine

use crate::models::SearchResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Synthesized answer text. May be empty when the index holds nothing
    /// relevant.
    pub text: String,

    /// Chunk matches the answer was conditioned on, highest score first.
    pub sources: Vec<SearchResult>,

    /// True when the text came from the extractive fallback rather than a
    /// model completion.
    pub extractive: bool,
}

impl Answer {
    pub fn new(text: String, sources: Vec<SearchResult>, extractive: bool) -> Self {
        Self {
            text,
            sources,
            extractive,
        }
    }

    pub fn empty() -> Self {
        Self {
            text: String::new(),
            sources: Vec::new(),
            extractive: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_answer() {
        let answer = Answer::empty();
        assert!(answer.is_empty());
        assert!(answer.sources.is_empty());
        assert!(answer.extractive);
    }
}
