// file: src/config.rs
// description: application configuration management with toml support
// reference: https://docs.rs/config

use crate::error::{AssistantError, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub knowledge: KnowledgeConfig,
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KnowledgeConfig {
    pub data_dir: PathBuf,
    pub chunk_size: usize,
    pub max_file_size_mb: usize,
    pub skip_patterns: Vec<String>,
    pub strip_markdown: bool,
    pub parallel_workers: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub table_name: String,
    pub batch_size: usize,
    pub embedding_dim: usize,
    pub api_key: Option<String>,
    pub api_base: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    pub top_k: usize,
    pub synthesis_model: String,
    pub max_context_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealtimeConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub instructions: String,
    pub stream_buffer: usize,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(config::File::from(Path::new("config/default.toml")));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VOICE_RAG")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| AssistantError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| AssistantError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            knowledge: KnowledgeConfig {
                data_dir: PathBuf::from("data"),
                chunk_size: 512,
                max_file_size_mb: 10,
                skip_patterns: vec![
                    "*.zip".to_string(),
                    "*.pdf".to_string(),
                    ".git/*".to_string(),
                ],
                strip_markdown: true,
                parallel_workers: 4,
            },
            database: DatabaseConfig {
                uri: "data/lancedb".to_string(),
                table_name: "chunks".to_string(),
                batch_size: 100,
                embedding_dim: 768,
                api_key: None,
                api_base: "https://api.openai.com/v1".to_string(),
                embedding_model: "text-embedding-3-small".to_string(),
            },
            query: QueryConfig {
                top_k: 2,
                synthesis_model: "gpt-4o-mini".to_string(),
                max_context_chars: 4000,
            },
            realtime: RealtimeConfig {
                api_key: None,
                endpoint: "wss://api.openai.com/v1/realtime".to_string(),
                model: "gpt-4o-realtime-preview".to_string(),
                voice: "alloy".to_string(),
                instructions: "You are a helpful voice assistant. Use the rag tool to answer \
                               questions from the knowledge base."
                    .to_string(),
                stream_buffer: 64,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.knowledge.chunk_size == 0 {
            return Err(AssistantError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.knowledge.parallel_workers == 0 {
            return Err(AssistantError::Config(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }

        if self.database.batch_size == 0 {
            return Err(AssistantError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.database.embedding_dim == 0 {
            return Err(AssistantError::Config(
                "embedding_dim must be greater than 0".to_string(),
            ));
        }

        if self.query.top_k == 0 {
            return Err(AssistantError::Config(
                "top_k must be greater than 0".to_string(),
            ));
        }

        if self.realtime.stream_buffer == 0 {
            return Err(AssistantError::Config(
                "stream_buffer must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
