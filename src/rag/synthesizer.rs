// file: src/rag/synthesizer.rs
// description: answer synthesis over retrieved context via chat completions
// reference: https://platform.openai.com/docs/api-reference/chat

use crate::error::{AssistantError, Result};
use crate::models::SearchResult;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "Answer the question using only the provided context. \
                             If the context does not contain the answer, say so briefly.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct AnswerSynthesizer {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    max_context_chars: usize,
}

impl AnswerSynthesizer {
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        model: String,
        max_context_chars: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base,
            api_key,
            model,
            max_context_chars,
        }
    }

    /// Produce one answer string from the retrieved chunks. Uses the chat
    /// completions API when a key is configured, otherwise (or on API
    /// failure) falls back to an extractive answer built from the chunks
    /// themselves. Returns the text and whether the fallback was used.
    pub async fn synthesize(
        &self,
        query: &str,
        results: &[SearchResult],
    ) -> Result<(String, bool)> {
        if results.is_empty() {
            return Ok((String::new(), true));
        }

        let context = self.build_context(results);

        if let Some(ref api_key) = self.api_key {
            match self.complete(api_key, query, &context).await {
                Ok(text) => return Ok((text, false)),
                Err(e) => {
                    warn!("Answer synthesis failed: {}. Using extractive answer.", e);
                }
            }
        } else {
            debug!("No API key configured, using extractive answer");
        }

        Ok((self.extractive_answer(results), true))
    }

    async fn complete(&self, api_key: &str, query: &str, context: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: format!("{}\n\nContext:\n{}", SYSTEM_PROMPT, context),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: query.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::Synthesis(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AssistantError::Synthesis(format!(
                "Chat request failed with status {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Synthesis(format!("Failed to parse response: {}", e)))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AssistantError::Synthesis("No choices in chat response".to_string()))
    }

    fn build_context(&self, results: &[SearchResult]) -> String {
        let mut context = String::new();

        for result in results {
            if context.chars().count() >= self.max_context_chars {
                break;
            }
            context.push_str(&format!(
                "[{} #{}]\n{}\n\n",
                result.relative_path, result.chunk_index, result.content
            ));
        }

        truncate_chars(&context, self.max_context_chars)
    }

    fn extractive_answer(&self, results: &[SearchResult]) -> String {
        let joined = results
            .iter()
            .map(|r| r.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        truncate_chars(&joined, self.max_context_chars)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.trim_end().to_string();
    }
    text.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(path: &str, index: u32, content: &str) -> SearchResult {
        SearchResult::new(
            format!("id-{}", index),
            format!("/kb/{}", path),
            path.to_string(),
            index,
            content.to_string(),
            0.9,
            Some(0.1),
        )
    }

    #[tokio::test]
    async fn test_extractive_fallback_without_key() {
        let synthesizer = AnswerSynthesizer::new(
            "https://api.openai.com/v1".to_string(),
            None,
            "gpt-4o-mini".to_string(),
            4000,
        );

        let results = vec![
            result("policy.md", 0, "Refunds are accepted within 30 days."),
            result("policy.md", 1, "Shipping is free over 50 euros."),
        ];

        let (text, extractive) = synthesizer.synthesize("refunds?", &results).await.unwrap();
        assert!(extractive);
        assert!(text.contains("30 days"));
        assert!(text.contains("Shipping"));
    }

    #[tokio::test]
    async fn test_empty_results_yield_empty_answer() {
        let synthesizer = AnswerSynthesizer::new(
            "https://api.openai.com/v1".to_string(),
            None,
            "gpt-4o-mini".to_string(),
            4000,
        );

        let (text, extractive) = synthesizer.synthesize("anything", &[]).await.unwrap();
        assert!(text.is_empty());
        assert!(extractive);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("exactly ten", 7), "exactly");
    }
}
