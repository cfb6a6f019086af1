// file: src/realtime/node.rs
// description: realtime model node owning the websocket session and tool dispatch
// reference: https://docs.rs/tokio-tungstenite

use crate::config::RealtimeConfig;
use crate::error::{AssistantError, Result};
use crate::realtime::events::{
    ClientEvent, ConversationItem, ServerEvent, SessionConfig, ToolDeclaration,
};
use crate::realtime::stream::{
    audio_channel, text_channel, AudioFrame, AudioSink, AudioStream, TextSink, TextStream,
};
use crate::tool::ToolRegistry;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Handle on a running session: the spawned task plus its shutdown signal.
struct SessionHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The realtime model node. Connects to an OpenAI-compatible realtime
/// endpoint, declares the registered tools, forwards the input streams, and
/// surfaces the model's audio and text output as streams.
pub struct RealtimeNode {
    config: RealtimeConfig,
    tools: Arc<ToolRegistry>,
    session: Option<SessionHandle>,
}

impl RealtimeNode {
    pub fn new(config: RealtimeConfig, tools: Arc<ToolRegistry>) -> Self {
        Self {
            config,
            tools,
            session: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Connect, configure the session, and start forwarding. Returns the
    /// output streams in (audio, text) order.
    pub async fn run(
        &mut self,
        audio_in: AudioStream,
        text_in: TextStream,
    ) -> Result<(AudioStream, TextStream)> {
        if self.session.is_some() {
            return Err(AssistantError::Realtime(
                "Session is already running".to_string(),
            ));
        }

        let api_key = self.config.api_key.clone().ok_or_else(|| {
            AssistantError::Realtime("No API key configured for realtime session".to_string())
        })?;

        let session_id = Uuid::new_v4();
        let url = format!("{}?model={}", self.config.endpoint, self.config.model);
        info!("Starting realtime session {} against {}", session_id, url);

        let mut request = url
            .into_client_request()
            .map_err(|e| AssistantError::Realtime(format!("Invalid endpoint: {}", e)))?;

        let headers = request.headers_mut();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| AssistantError::Realtime(format!("Invalid API key: {}", e)))?,
        );
        headers.insert("OpenAI-Beta", HeaderValue::from_static("realtime=v1"));

        let (ws, _) = connect_async(request)
            .await
            .map_err(|e| AssistantError::Realtime(format!("Connection failed: {}", e)))?;

        let (mut ws_tx, ws_rx) = ws.split();

        send_event(
            &mut ws_tx,
            &ClientEvent::SessionUpdate {
                session: self.session_config(),
            },
        )
        .await?;

        let (audio_out_tx, audio_out) = audio_channel(self.config.stream_buffer);
        let (text_out_tx, text_out) = text_channel(self.config.stream_buffer);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let tools = Arc::clone(&self.tools);
        let task = tokio::spawn(session_loop(
            ws_tx,
            ws_rx,
            audio_in,
            text_in,
            audio_out_tx,
            text_out_tx,
            tools,
            shutdown_rx,
        ));

        self.session = Some(SessionHandle {
            shutdown: shutdown_tx,
            task,
        });

        Ok((audio_out, text_out))
    }

    /// Stop the session task and close the socket. A close without a running
    /// session is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(handle) = self.session.take() {
            info!("Closing realtime session");
            let _ = handle.shutdown.send(());
            if let Err(e) = handle.task.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }
        Ok(())
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            modalities: vec!["audio".to_string(), "text".to_string()],
            instructions: self.config.instructions.clone(),
            voice: self.config.voice.clone(),
            input_audio_format: "pcm16".to_string(),
            output_audio_format: "pcm16".to_string(),
            tools: self
                .tools
                .descriptors()
                .into_iter()
                .map(ToolDeclaration::from)
                .collect(),
            tool_choice: "auto".to_string(),
        }
    }
}

async fn send_event(ws_tx: &mut WsSink, event: &ClientEvent) -> Result<()> {
    let text = serde_json::to_string(event)?;
    ws_tx
        .send(Message::Text(text))
        .await
        .map_err(|e| AssistantError::Realtime(format!("Failed to send event: {}", e)))
}

#[allow(clippy::too_many_arguments)]
async fn session_loop(
    mut ws_tx: WsSink,
    mut ws_rx: WsSource,
    mut audio_in: AudioStream,
    mut text_in: TextStream,
    audio_out: AudioSink,
    text_out: TextSink,
    tools: Arc<ToolRegistry>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut audio_in_done = false;
    let mut text_in_done = false;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Session shutdown requested");
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }

            frame = audio_in.recv(), if !audio_in_done => {
                match frame {
                    Some(frame) => {
                        let event = ClientEvent::InputAudioBufferAppend {
                            audio: BASE64.encode(&frame.pcm),
                        };
                        if let Err(e) = send_event(&mut ws_tx, &event).await {
                            error!("Failed to forward audio input: {}", e);
                            break;
                        }
                    }
                    None => {
                        debug!("Audio input stream closed");
                        audio_in_done = true;
                    }
                }
            }

            text = text_in.recv(), if !text_in_done => {
                match text {
                    Some(text) => {
                        if let Err(e) = forward_text_input(&mut ws_tx, text).await {
                            error!("Failed to forward text input: {}", e);
                            break;
                        }
                    }
                    None => {
                        debug!("Text input stream closed");
                        text_in_done = true;
                    }
                }
            }

            message = ws_rx.next() => {
                match message {
                    Some(Ok(Message::Text(raw))) => {
                        let event = match serde_json::from_str::<ServerEvent>(&raw) {
                            Ok(event) => event,
                            Err(e) => {
                                warn!("Unparseable server event: {}", e);
                                continue;
                            }
                        };

                        if !handle_server_event(
                            event,
                            &mut ws_tx,
                            &audio_out,
                            &text_out,
                            &tools,
                        )
                        .await
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Server closed the session");
                        break;
                    }
                    Some(Ok(_)) => {
                        // ping/pong/binary frames need no action here
                    }
                    Some(Err(e)) => {
                        error!("Session socket error: {}", e);
                        break;
                    }
                    None => {
                        info!("Session socket ended");
                        break;
                    }
                }
            }
        }
    }

    debug!("Session loop finished");
}

/// React to one server event. Returns false when the session should end.
async fn handle_server_event(
    event: ServerEvent,
    ws_tx: &mut WsSink,
    audio_out: &AudioSink,
    text_out: &TextSink,
    tools: &ToolRegistry,
) -> bool {
    match event {
        ServerEvent::SessionCreated => {
            info!("Realtime session established");
        }
        ServerEvent::SessionUpdated => {
            debug!("Session configuration acknowledged");
        }
        ServerEvent::ResponseAudioDelta { delta } => match BASE64.decode(delta.as_bytes()) {
            Ok(pcm) => {
                if audio_out.send(AudioFrame::new(pcm)).await.is_err() {
                    info!("Audio output receiver dropped, ending session");
                    return false;
                }
            }
            Err(e) => {
                warn!("Invalid audio delta payload: {}", e);
            }
        },
        ServerEvent::ResponseAudioTranscriptDelta { delta }
        | ServerEvent::ResponseTextDelta { delta } => {
            if text_out.send(delta).await.is_err() {
                info!("Text output receiver dropped, ending session");
                return false;
            }
        }
        ServerEvent::ResponseFunctionCallArgumentsDone {
            call_id,
            name,
            arguments,
        } => {
            let output = dispatch_tool_call(tools, &name, &arguments).await;
            let item = ConversationItem::function_call_output(call_id, output);

            if let Err(e) = send_event(ws_tx, &ClientEvent::ConversationItemCreate { item }).await
            {
                error!("Failed to return tool output: {}", e);
                return false;
            }
            if let Err(e) = send_event(ws_tx, &ClientEvent::ResponseCreate).await {
                error!("Failed to request follow-up response: {}", e);
                return false;
            }
        }
        ServerEvent::ResponseDone => {
            debug!("Response complete");
        }
        ServerEvent::Error { error } => {
            error!(
                "Server error event ({}): {}",
                error.kind.as_deref().unwrap_or("unknown"),
                error.message.as_deref().unwrap_or("no message")
            );
        }
        ServerEvent::Unknown => {}
    }

    true
}

async fn forward_text_input(ws_tx: &mut WsSink, text: String) -> Result<()> {
    send_event(
        ws_tx,
        &ClientEvent::ConversationItemCreate {
            item: ConversationItem::user_text(text),
        },
    )
    .await?;
    send_event(ws_tx, &ClientEvent::ResponseCreate).await
}

/// Run a tool and serialize its output for the model. Tool failures are
/// reported back as an error payload so the conversation can continue.
async fn dispatch_tool_call(tools: &ToolRegistry, name: &str, arguments: &str) -> String {
    let arguments = match serde_json::from_str(arguments) {
        Ok(value) => value,
        Err(e) => {
            warn!("Malformed tool arguments for {}: {}", name, e);
            return serde_json::json!({"error": format!("malformed arguments: {}", e)})
                .to_string();
        }
    };

    match tools.dispatch(name, arguments).await {
        Ok(result) => result.to_string(),
        Err(e) => {
            error!("Tool {} failed: {}", name, e);
            serde_json::json!({"error": e.to_string()}).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Result as CrateResult;
    use crate::tool::Tool;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase the input"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        fn response_schema(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn call(&self, arguments: serde_json::Value) -> CrateResult<serde_json::Value> {
            let text = arguments["text"].as_str().unwrap_or_default();
            Ok(json!({"result": text.to_uppercase()}))
        }
    }

    fn test_realtime_config(endpoint: String) -> crate::config::RealtimeConfig {
        let mut config = Config::default_config().realtime;
        config.api_key = Some("test-key".to_string());
        config.endpoint = endpoint;
        config
    }

    /// Minimal in-process session server: acknowledges the session, emits one
    /// audio delta and one text delta, requests a tool call, and relays the
    /// tool output back as a text delta.
    async fn run_fake_server(listener: TcpListener) {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = accept_async(stream).await.unwrap();
        let (mut tx, mut rx) = ws.split();

        // session.update arrives first
        let first = rx.next().await.unwrap().unwrap();
        let config: serde_json::Value =
            serde_json::from_str(first.to_text().unwrap()).unwrap();
        assert_eq!(config["type"], "session.update");
        assert_eq!(config["session"]["tools"][0]["name"], "upper");

        tx.send(Message::Text(
            json!({"type": "session.created"}).to_string(),
        ))
        .await
        .unwrap();

        tx.send(Message::Text(
            json!({"type": "response.audio.delta", "delta": BASE64.encode([1u8, 2, 3])})
                .to_string(),
        ))
        .await
        .unwrap();

        tx.send(Message::Text(
            json!({"type": "response.text.delta", "delta": "hello"}).to_string(),
        ))
        .await
        .unwrap();

        tx.send(Message::Text(
            json!({
                "type": "response.function_call_arguments.done",
                "call_id": "call_1",
                "name": "upper",
                "arguments": "{\"text\": \"loud\"}"
            })
            .to_string(),
        ))
        .await
        .unwrap();

        // expect function_call_output then response.create
        let output = rx.next().await.unwrap().unwrap();
        let output: serde_json::Value =
            serde_json::from_str(output.to_text().unwrap()).unwrap();
        assert_eq!(output["type"], "conversation.item.create");
        assert_eq!(output["item"]["type"], "function_call_output");
        assert_eq!(output["item"]["call_id"], "call_1");
        assert!(output["item"]["output"]
            .as_str()
            .unwrap()
            .contains("LOUD"));

        let follow_up = rx.next().await.unwrap().unwrap();
        let follow_up: serde_json::Value =
            serde_json::from_str(follow_up.to_text().unwrap()).unwrap();
        assert_eq!(follow_up["type"], "response.create");

        tx.send(Message::Text(
            json!({"type": "response.text.delta", "delta": " world"}).to_string(),
        ))
        .await
        .unwrap();

        // drain until the client closes
        while let Some(Ok(message)) = rx.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_run_without_api_key_fails() {
        let mut config = Config::default_config().realtime;
        config.api_key = None;

        let mut node = RealtimeNode::new(config, Arc::new(ToolRegistry::new()));
        let (_audio_tx, audio_rx) = audio_channel(4);
        let (_text_tx, text_rx) = text_channel(4);

        let err = node.run(audio_rx, text_rx).await.unwrap_err();
        assert!(err.to_string().contains("No API key"));
        assert!(!node.is_running());
    }

    #[tokio::test]
    async fn test_close_without_session_is_noop() {
        let mut node = RealtimeNode::new(
            Config::default_config().realtime,
            Arc::new(ToolRegistry::new()),
        );
        assert!(node.close().await.is_ok());
        assert!(node.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_session_forwards_streams_and_tool_calls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(run_fake_server(listener));

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));

        let mut node = RealtimeNode::new(
            test_realtime_config(format!("ws://{}", addr)),
            Arc::new(registry),
        );

        let (_audio_tx, audio_rx) = audio_channel(4);
        let (_text_tx, text_rx) = text_channel(4);

        let (mut audio_out, mut text_out) = node.run(audio_rx, text_rx).await.unwrap();
        assert!(node.is_running());

        let frame = audio_out.recv().await.unwrap();
        assert_eq!(frame.pcm, vec![1, 2, 3]);

        assert_eq!(text_out.recv().await.unwrap(), "hello");
        assert_eq!(text_out.recv().await.unwrap(), " world");

        node.close().await.unwrap();
        assert!(!node.is_running());

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_tool_call_reports_unknown_tool() {
        let registry = ToolRegistry::new();
        let output = dispatch_tool_call(&registry, "missing", "{}").await;
        assert!(output.contains("error"));
        assert!(output.contains("Unknown tool"));
    }
}
