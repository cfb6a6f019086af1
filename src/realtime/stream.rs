// file: src/realtime/stream.rs
// description: audio and text stream conduits passed through the application shell
// reference: bounded tokio mpsc channels

use tokio::sync::mpsc;

/// One frame of 16-bit little-endian PCM audio. The shell never inspects
/// frame contents; framing is owned by the realtime session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    pub pcm: Vec<u8>,
}

impl AudioFrame {
    pub fn new(pcm: Vec<u8>) -> Self {
        Self { pcm }
    }

    pub fn len(&self) -> usize {
        self.pcm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }
}

pub type AudioSink = mpsc::Sender<AudioFrame>;
pub type AudioStream = mpsc::Receiver<AudioFrame>;
pub type TextSink = mpsc::Sender<String>;
pub type TextStream = mpsc::Receiver<String>;

pub fn audio_channel(capacity: usize) -> (AudioSink, AudioStream) {
    mpsc::channel(capacity)
}

pub fn text_channel(capacity: usize) -> (TextSink, TextStream) {
    mpsc::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_audio_channel_roundtrip() {
        let (tx, mut rx) = audio_channel(4);
        tx.send(AudioFrame::new(vec![1, 2, 3, 4])).await.unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.len(), 4);
        assert!(!frame.is_empty());
    }

    #[tokio::test]
    async fn test_text_channel_roundtrip() {
        let (tx, mut rx) = text_channel(4);
        tx.send("hello".to_string()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }
}
