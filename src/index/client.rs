// file: src/index/client.rs
// description: LanceDB client wrapper with connection management
// reference: https://docs.rs/lancedb

use crate::config::DatabaseConfig;
use crate::error::{AssistantError, Result};
use crate::models::SearchResult;
use arrow_array::{Float32Array, StringArray, UInt32Array};
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, Table};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct LanceDbClient {
    connection: Connection,
    config: DatabaseConfig,
}

impl LanceDbClient {
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        info!("Connecting to LanceDB at {}", config.uri);

        let connection = connect(&config.uri).execute().await.map_err(|e| {
            AssistantError::Database(format!("Failed to connect to LanceDB: {}", e))
        })?;

        Ok(Self { connection, config })
    }

    pub fn get_connection(&self) -> &Connection {
        &self.connection
    }

    pub async fn ping(&self) -> Result<bool> {
        debug!("Checking LanceDB connection");

        // Try to list tables as a ping equivalent
        match self.connection.table_names().execute().await {
            Ok(_) => {
                info!("LanceDB connection successful");
                Ok(true)
            }
            Err(e) => Err(AssistantError::Database(format!(
                "LanceDB connection failed: {}",
                e
            ))),
        }
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to list tables: {}", e)))?;

        Ok(table_names.iter().any(|name| name == table_name))
    }

    pub async fn get_table(&self, table_name: &str) -> Result<Table> {
        self.connection
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| {
                AssistantError::Database(format!("Failed to open table {}: {}", table_name, e))
            })
    }

    pub async fn get_chunk_count(&self) -> Result<u64> {
        if !self.table_exists(&self.config.table_name).await? {
            return Ok(0);
        }

        let table = self.get_table(&self.config.table_name).await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    pub fn embedding_dim(&self) -> usize {
        self.config.embedding_dim
    }

    pub fn api_key(&self) -> Option<&String> {
        self.config.api_key.as_ref()
    }

    pub fn api_base(&self) -> &str {
        &self.config.api_base
    }

    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    /// Search for chunks by vector similarity
    ///
    /// # Arguments
    /// * `query_embedding` - The query vector to search for
    /// * `limit` - Maximum number of results to return
    /// * `source_filter` - Optional relative source path to filter results
    ///
    /// # Returns
    /// Vector of SearchResult ordered by similarity (highest first)
    pub async fn vector_search(
        &self,
        query_embedding: Vec<f32>,
        limit: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        if !self.table_exists(&self.config.table_name).await? {
            warn!("Table does not exist, returning empty results");
            return Ok(Vec::new());
        }

        let table = self.get_table(&self.config.table_name).await?;

        info!("Performing vector search with limit {}", limit);

        let mut query = table
            .vector_search(query_embedding)
            .map_err(|e| {
                AssistantError::Database(format!("Failed to create vector search: {}", e))
            })?
            .limit(limit);

        if let Some(source) = source_filter {
            let filter = format!("relative_path = '{}'", source.replace('\'', "''"));
            query = query.only_if(&filter);
            debug!("Applied filter: {}", filter);
        }

        let mut results_stream = query
            .execute()
            .await
            .map_err(|e| AssistantError::Database(format!("Vector search failed: {}", e)))?;

        // Convert Arrow RecordBatch results to SearchResult objects
        let mut search_results = Vec::new();

        while let Some(batch_result) = results_stream.next().await {
            let batch = batch_result.map_err(|e| {
                AssistantError::Database(format!("Failed to read result batch: {}", e))
            })?;

            let num_rows = batch.num_rows();

            let ids = string_column(&batch, "id")?;
            let source_paths = string_column(&batch, "source_path")?;
            let relative_paths = string_column(&batch, "relative_path")?;
            let contents = string_column(&batch, "content")?;

            let chunk_indices = batch
                .column_by_name("chunk_index")
                .ok_or_else(|| {
                    AssistantError::Database("Missing 'chunk_index' column".to_string())
                })?
                .as_any()
                .downcast_ref::<UInt32Array>()
                .ok_or_else(|| {
                    AssistantError::Database("Invalid 'chunk_index' column type".to_string())
                })?;

            // LanceDB returns distance score in a special column
            let distances = batch
                .column_by_name("_distance")
                .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

            for i in 0..num_rows {
                // Get distance and convert to similarity score
                let (score, distance) = if let Some(dist_array) = distances {
                    let dist = dist_array.value(i);
                    // Convert distance to similarity (lower distance = higher similarity)
                    let similarity = 1.0 / (1.0 + dist);
                    (similarity, Some(dist))
                } else {
                    (1.0, None)
                };

                search_results.push(SearchResult::new(
                    ids.value(i).to_string(),
                    source_paths.value(i).to_string(),
                    relative_paths.value(i).to_string(),
                    chunk_indices.value(i),
                    contents.value(i).to_string(),
                    score,
                    distance,
                ));
            }
        }

        info!("Vector search returned {} results", search_results.len());
        Ok(search_results)
    }
}

fn string_column<'a>(
    batch: &'a arrow_array::RecordBatch,
    name: &str,
) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| AssistantError::Database(format!("Missing '{}' column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| AssistantError::Database(format!("Invalid '{}' column type", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let config = DatabaseConfig {
            uri: "memory://test".to_string(),
            table_name: "test_chunks".to_string(),
            batch_size: 100,
            embedding_dim: 768,
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        };

        assert_eq!(config.uri, "memory://test");
        assert_eq!(config.table_name, "test_chunks");
    }
}
