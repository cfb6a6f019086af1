// file: src/realtime/mod.rs
// description: realtime session module exports
// reference: internal module structure

pub mod events;
pub mod node;
pub mod stream;

pub use events::{ClientEvent, ServerEvent, SessionConfig, ToolDeclaration};
pub use node::RealtimeNode;
pub use stream::{
    audio_channel, text_channel, AudioFrame, AudioSink, AudioStream, TextSink, TextStream,
};
