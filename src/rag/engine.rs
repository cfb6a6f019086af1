// file: src/rag/engine.rs
// description: retrieval query engine combining embeddings, vector search, and synthesis

use crate::config::QueryConfig;
use crate::error::Result;
use crate::index::{EmbeddingClient, LanceDbClient};
use crate::models::{Answer, SearchResult};
use crate::rag::synthesizer::AnswerSynthesizer;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One shared retrieval engine: embeds a query, searches the chunk table, and
/// synthesizes an answer. The voice tool and the CLI both query through the
/// same instance.
pub struct QueryEngine {
    client: LanceDbClient,
    embedding_client: Option<Arc<EmbeddingClient>>,
    synthesizer: AnswerSynthesizer,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(client: LanceDbClient, query_config: QueryConfig) -> Self {
        let embedding_client = client.api_key().map(|key| {
            Arc::new(EmbeddingClient::new(
                client.api_base().to_string(),
                key.clone(),
                client.embedding_model().to_string(),
            ))
        });

        let synthesizer = AnswerSynthesizer::new(
            client.api_base().to_string(),
            client.api_key().cloned(),
            query_config.synthesis_model.clone(),
            query_config.max_context_chars,
        );

        if embedding_client.is_none() {
            warn!("QueryEngine initialized without API key - using fallback embeddings");
        }

        Self {
            client,
            embedding_client,
            synthesizer,
            top_k: query_config.top_k,
        }
    }

    /// Retrieve the top-k chunks for a query without synthesis. An optional
    /// source path narrows the search to one document.
    pub async fn retrieve(
        &self,
        query: &str,
        limit: usize,
        source: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let embedding = self.embed_query(query).await;
        self.client.vector_search(embedding, limit, source).await
    }

    /// Full RAG path: retrieve top-k chunks and synthesize one answer. An
    /// empty index yields an empty answer rather than an error.
    pub async fn query(&self, query: &str) -> Result<Answer> {
        debug!("Querying knowledge base: {}", query);

        let results = self.retrieve(query, self.top_k, None).await?;

        if results.is_empty() {
            info!("No chunks matched query");
            return Ok(Answer::empty());
        }

        let (text, extractive) = self.synthesizer.synthesize(query, &results).await?;
        Ok(Answer::new(text, results, extractive))
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    async fn embed_query(&self, query: &str) -> Vec<f32> {
        let dim = self.client.embedding_dim();

        if let Some(ref client) = self.embedding_client {
            match client.generate_embedding(query).await {
                Ok(embedding) if embedding.len() == dim => return embedding,
                Ok(embedding) => {
                    warn!(
                        "API returned embedding with dimension {}, expected {}. Using fallback.",
                        embedding.len(),
                        dim
                    );
                }
                Err(e) => {
                    warn!("API embedding failed: {}. Using fallback.", e);
                }
            }
        }

        EmbeddingClient::generate_fallback_embedding(query, dim)
    }
}
