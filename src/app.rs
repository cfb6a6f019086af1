// file: src/app.rs
// description: voice application shell with explicit setup/run/teardown lifecycle

use crate::config::Config;
use crate::error::{AssistantError, Result};
use crate::index::LanceDbClient;
use crate::pipeline::IndexBuilder;
use crate::rag::QueryEngine;
use crate::realtime::{AudioStream, RealtimeNode, TextStream};
use crate::tool::{RagTool, ToolRegistry};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Uninitialized,
    Ready,
    Running,
    TornDown,
}

/// The voice assistant application. The host runtime calls `setup` once,
/// `run` per session with the input stream handles, and `teardown` on
/// shutdown. Out-of-order calls are lifecycle errors.
pub struct VoiceApp {
    config: Config,
    state: AppState,
    engine: Option<Arc<QueryEngine>>,
    node: Option<RealtimeNode>,
}

impl VoiceApp {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: AppState::Uninitialized,
            engine: None,
            node: None,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// The query engine shared between the `rag` tool and the shell.
    /// Available after `setup`.
    pub fn query_engine(&self) -> Option<Arc<QueryEngine>> {
        self.engine.clone()
    }

    /// Build the index if needed, construct the shared query engine, and
    /// assemble the realtime node with the `rag` tool registered. Failure
    /// here (missing data directory, unreachable database) is fatal and
    /// propagates to the host.
    pub async fn setup(&mut self) -> Result<()> {
        self.expect_state(AppState::Uninitialized, "setup")?;

        info!("Setting up voice application");

        let client = LanceDbClient::new(self.config.database.clone()).await?;
        client.ping().await?;

        let builder = IndexBuilder::new(self.config.clone());
        let stats = builder.ensure_index(&client).await?;
        if stats.chunks_indexed > 0 {
            info!(
                "Indexed {} chunks from {} documents",
                stats.chunks_indexed, stats.documents_loaded
            );
        }

        let engine = Arc::new(QueryEngine::new(client, self.config.query.clone()));

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(RagTool::new(Arc::clone(&engine))));

        self.node = Some(RealtimeNode::new(
            self.config.realtime.clone(),
            Arc::new(registry),
        ));
        self.engine = Some(engine);
        self.state = AppState::Ready;

        info!("Voice application ready");
        Ok(())
    }

    /// Forward the input streams into the realtime node and hand back its
    /// output streams unmodified, in (audio, text) order.
    pub async fn run(
        &mut self,
        audio_in: AudioStream,
        text_in: TextStream,
    ) -> Result<(AudioStream, TextStream)> {
        self.expect_state(AppState::Ready, "run")?;

        let node = self
            .node
            .as_mut()
            .ok_or_else(|| AssistantError::Lifecycle("Realtime node missing".to_string()))?;

        let outputs = node.run(audio_in, text_in).await?;
        self.state = AppState::Running;

        Ok(outputs)
    }

    /// Release the realtime node. Valid once, after `setup` (whether or not
    /// a session was started).
    pub async fn teardown(&mut self) -> Result<()> {
        if self.state != AppState::Ready && self.state != AppState::Running {
            return Err(AssistantError::Lifecycle(format!(
                "teardown called in state {:?}",
                self.state
            )));
        }

        info!("Tearing down voice application");

        if let Some(mut node) = self.node.take() {
            node.close().await?;
        }

        self.state = AppState::TornDown;
        Ok(())
    }

    fn expect_state(&self, expected: AppState, operation: &str) -> Result<()> {
        if self.state != expected {
            return Err(AssistantError::Lifecycle(format!(
                "{} called in state {:?}, expected {:?}",
                operation, self.state, expected
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::{audio_channel, text_channel};
    use futures::{SinkExt, StreamExt};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    fn test_config(temp: &TempDir) -> Config {
        let data_dir = temp.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        fs::write(
            data_dir.join("policy.md"),
            "# Refund Policy\n\nRefunds are accepted within 30 days of purchase.",
        )
        .unwrap();

        let mut config = Config::default_config();
        config.knowledge.data_dir = data_dir;
        config.database.uri = temp.path().join("lancedb").to_string_lossy().to_string();
        config.database.embedding_dim = 16;
        config
    }

    /// Accepts one session, emits a text and an audio delta, waits for close.
    async fn run_fake_server(listener: TcpListener) {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        let (mut tx, mut rx) = ws.split();

        let first = rx.next().await.unwrap().unwrap();
        let config: serde_json::Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
        assert_eq!(config["type"], "session.update");
        assert_eq!(config["session"]["tools"][0]["name"], "rag");

        tx.send(Message::Text(
            json!({"type": "response.text.delta", "delta": "answer"}).to_string(),
        ))
        .await
        .unwrap();

        tx.send(Message::Text(
            json!({"type": "response.audio.delta", "delta": "AQID"}).to_string(),
        ))
        .await
        .unwrap();

        while let Some(Ok(message)) = rx.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_setup_transitions_to_ready() {
        let temp = TempDir::new().unwrap();
        let mut app = VoiceApp::new(test_config(&temp));

        assert_eq!(app.state(), AppState::Uninitialized);
        app.setup().await.unwrap();
        assert_eq!(app.state(), AppState::Ready);
        assert!(app.query_engine().is_some());
    }

    #[tokio::test]
    async fn test_setup_fails_on_missing_data_dir() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(&temp);
        config.knowledge.data_dir = temp.path().join("absent");

        let mut app = VoiceApp::new(config);
        assert!(app.setup().await.is_err());
        assert_eq!(app.state(), AppState::Uninitialized);
    }

    #[tokio::test]
    async fn test_run_before_setup_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut app = VoiceApp::new(test_config(&temp));

        let (_audio_tx, audio_rx) = audio_channel(4);
        let (_text_tx, text_rx) = text_channel(4);

        let err = app.run(audio_rx, text_rx).await.unwrap_err();
        assert!(matches!(err, AssistantError::Lifecycle(_)));
    }

    #[tokio::test]
    async fn test_teardown_once_after_setup() {
        let temp = TempDir::new().unwrap();
        let mut app = VoiceApp::new(test_config(&temp));

        app.setup().await.unwrap();
        app.teardown().await.unwrap();
        assert_eq!(app.state(), AppState::TornDown);

        // second teardown is a lifecycle error
        assert!(app.teardown().await.is_err());
    }

    #[tokio::test]
    async fn test_run_passes_node_streams_through() {
        let temp = TempDir::new().unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(run_fake_server(listener));

        let mut config = test_config(&temp);
        config.realtime.api_key = Some("test-key".to_string());
        config.realtime.endpoint = format!("ws://{}", addr);

        let mut app = VoiceApp::new(config);
        app.setup().await.unwrap();

        let (_audio_tx, audio_rx) = audio_channel(4);
        let (_text_tx, text_rx) = text_channel(4);

        let (mut audio_out, mut text_out) = app.run(audio_rx, text_rx).await.unwrap();
        assert_eq!(app.state(), AppState::Running);

        assert_eq!(text_out.recv().await.unwrap(), "answer");
        assert_eq!(audio_out.recv().await.unwrap().pcm, vec![1, 2, 3]);

        app.teardown().await.unwrap();
        server.await.unwrap();
    }
}
