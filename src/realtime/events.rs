// file: src/realtime/events.rs
// description: wire protocol event types for the realtime session
// reference: https://platform.openai.com/docs/api-reference/realtime

use crate::tool::ToolDescriptor;
use serde::{Deserialize, Serialize};

/// Events the client sends over the session socket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },

    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },

    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    #[serde(rename = "response.create")]
    ResponseCreate,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    pub modalities: Vec<String>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_format: String,
    pub output_audio_format: String,
    pub tools: Vec<ToolDeclaration>,
    pub tool_choice: String,
}

/// A tool as declared to the session.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl From<ToolDescriptor> for ToolDeclaration {
    fn from(descriptor: ToolDescriptor) -> Self {
        Self {
            kind: "function".to_string(),
            name: descriptor.name,
            description: descriptor.description,
            parameters: descriptor.parameters,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationItem {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentPart>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl ConversationItem {
    pub fn user_text(text: String) -> Self {
        Self {
            kind: "message".to_string(),
            role: Some("user".to_string()),
            content: Some(vec![ContentPart {
                kind: "input_text".to_string(),
                text,
            }]),
            call_id: None,
            output: None,
        }
    }

    pub fn function_call_output(call_id: String, output: String) -> Self {
        Self {
            kind: "function_call_output".to_string(),
            role: None,
            content: None,
            call_id: Some(call_id),
            output: Some(output),
        }
    }
}

/// Events the server sends back. Only the shapes the session loop acts on
/// are modeled; everything else lands in `Unknown`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated,

    #[serde(rename = "session.updated")]
    SessionUpdated,

    #[serde(rename = "response.audio.delta")]
    ResponseAudioDelta { delta: String },

    #[serde(rename = "response.audio_transcript.delta")]
    ResponseAudioTranscriptDelta { delta: String },

    #[serde(rename = "response.text.delta")]
    ResponseTextDelta { delta: String },

    #[serde(rename = "response.function_call_arguments.done")]
    ResponseFunctionCallArgumentsDone {
        call_id: String,
        name: String,
        arguments: String,
    },

    #[serde(rename = "response.done")]
    ResponseDone,

    #[serde(rename = "error")]
    Error { error: ErrorDetail },

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_client_event_serialization() {
        let event = ClientEvent::InputAudioBufferAppend {
            audio: "AAAA".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"type": "input_audio_buffer.append", "audio": "AAAA"})
        );
    }

    #[test]
    fn test_response_create_serialization() {
        let value = serde_json::to_value(ClientEvent::ResponseCreate).unwrap();
        assert_eq!(value, json!({"type": "response.create"}));
    }

    #[test]
    fn test_user_text_item() {
        let item = ConversationItem::user_text("hello".to_string());
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"][0]["type"], "input_text");
        assert!(value.get("call_id").is_none());
    }

    #[test]
    fn test_function_call_output_item() {
        let item =
            ConversationItem::function_call_output("call_1".to_string(), "{}".to_string());
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "function_call_output");
        assert_eq!(value["call_id"], "call_1");
        assert!(value.get("role").is_none());
    }

    #[test]
    fn test_server_event_deserialization() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type": "response.audio.delta", "delta": "UklGRg=="}"#)
                .unwrap();
        assert!(matches!(
            event,
            ServerEvent::ResponseAudioDelta { ref delta } if delta == "UklGRg=="
        ));
    }

    #[test]
    fn test_function_call_event_deserialization() {
        let raw = r#"{
            "type": "response.function_call_arguments.done",
            "call_id": "call_9",
            "name": "rag",
            "arguments": "{\"query_for_neural_search\": \"refunds\"}"
        }"#;
        let event: ServerEvent = serde_json::from_str(raw).unwrap();

        match event {
            ServerEvent::ResponseFunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => {
                assert_eq!(call_id, "call_9");
                assert_eq!(name, "rag");
                assert!(arguments.contains("refunds"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_event_is_unknown() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type": "rate_limits.updated"}"#).unwrap();
        assert!(matches!(event, ServerEvent::Unknown));
    }
}
