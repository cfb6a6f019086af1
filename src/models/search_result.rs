// file: src/models/search_result.rs
// description: Search result model with similarity scores
// reference: Used for vector similarity search results

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk ID (content hash + chunk index)
    pub id: String,

    /// Path of the source document
    pub source_path: String,

    /// Path relative to the data directory
    pub relative_path: String,

    /// Position of the chunk within its source document
    pub chunk_index: u32,

    /// Chunk content
    pub content: String,

    /// Similarity score (higher is more similar, typically 0.0-1.0)
    pub score: f32,

    /// Optional: Distance metric (lower is more similar)
    pub distance: Option<f32>,
}

impl SearchResult {
    /// Create a new search result
    pub fn new(
        id: String,
        source_path: String,
        relative_path: String,
        chunk_index: u32,
        content: String,
        score: f32,
        distance: Option<f32>,
    ) -> Self {
        Self {
            id,
            source_path,
            relative_path,
            chunk_index,
            content,
            score,
            distance,
        }
    }

    /// Format as a summary string for display
    pub fn format_summary(&self, max_content_len: usize) -> String {
        let content_preview = if self.content.len() > max_content_len {
            let cut = self
                .content
                .char_indices()
                .take_while(|(i, _)| *i < max_content_len)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            format!("{}...", &self.content[..cut])
        } else {
            self.content.clone()
        };

        format!(
            "Score: {:.4} | {} (chunk {})\n{}\n",
            self.score, self.relative_path, self.chunk_index, content_preview
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_result_creation() {
        let result = SearchResult::new(
            "abc123-0".to_string(),
            "/kb/policy.md".to_string(),
            "policy.md".to_string(),
            0,
            "Test content".to_string(),
            0.95,
            Some(0.05),
        );

        assert_eq!(result.score, 0.95);
        assert_eq!(result.distance, Some(0.05));
        assert_eq!(result.relative_path, "policy.md");
    }

    #[test]
    fn test_format_summary() {
        let result = SearchResult::new(
            "abc123-3".to_string(),
            "/kb/docs/readme.md".to_string(),
            "docs/readme.md".to_string(),
            3,
            "This is a very long content that will be truncated".to_string(),
            0.87,
            None,
        );

        let summary = result.format_summary(20);
        assert!(summary.contains("0.8700"));
        assert!(summary.contains("docs/readme.md"));
        assert!(summary.contains("..."));
    }
}
