// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod app;
pub mod config;
pub mod error;
pub mod index;
pub mod knowledge;
pub mod models;
pub mod pipeline;
pub mod rag;
pub mod realtime;
pub mod tool;
pub mod utils;

pub use app::{AppState, VoiceApp};
pub use config::{Config, DatabaseConfig, KnowledgeConfig, QueryConfig, RealtimeConfig};
pub use error::{AssistantError, Result};
pub use index::{ChunkInserter, EmbeddingClient, InsertStats, LanceDbClient, SchemaManager};
pub use knowledge::{DirectoryReader, LoadedDocument, MarkdownExtractor, TextChunker};
pub use models::{Answer, Chunk, SearchResult};
pub use pipeline::{IndexBuilder, IngestStats, PipelineStats, ProgressTracker};
pub use rag::{AnswerSynthesizer, QueryEngine};
pub use realtime::{
    audio_channel, text_channel, AudioFrame, AudioStream, RealtimeNode, TextStream,
};
pub use tool::{RagTool, Tool, ToolRegistry};
pub use utils::{HealthCheck, HealthReport, HealthStatus, OperationTimer, Validator};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _config = Config::default_config();
        let _registry = ToolRegistry::new();
    }
}
