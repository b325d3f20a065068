//! Shared test utilities

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use parlance::recognizer::{
    Recognizer, RecognizerEvent, TranscriptAlternative, TranscriptEvent, TranscriptResult,
};
use parlance::{Config, Error, Result};

/// Config pointing at an unreachable endpoint, manual-answer mode
#[must_use]
pub fn test_config() -> Config {
    Config {
        endpoint: "http://localhost:9/v1/chat/completions".to_string(),
        model: "test-model".to_string(),
        api_key: None,
        silence_window: Duration::from_millis(50),
        watchdog: Duration::from_secs(5),
        history_cap: 32,
        auto_answer: false,
        continuous: false,
    }
}

/// Recognizer fed by the test through a channel
pub struct ScriptedRecognizer {
    receiver: Option<mpsc::Receiver<RecognizerEvent>>,
    active: bool,
}

impl ScriptedRecognizer {
    /// Recognizer plus the sender the test scripts events on
    #[must_use]
    pub fn new() -> (Self, mpsc::Sender<RecognizerEvent>) {
        let (tx, rx) = mpsc::channel(32);
        (
            Self {
                receiver: Some(rx),
                active: false,
            },
            tx,
        )
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>> {
        self.active = true;
        self.receiver
            .take()
            .ok_or_else(|| Error::Recognizer("scripted recognizer already started".to_string()))
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn abort(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

/// Single-result transcript event with one alternative
#[must_use]
pub fn transcript(text: &str, is_final: bool, result_index: usize) -> RecognizerEvent {
    RecognizerEvent::Transcript(TranscriptEvent {
        result_index,
        results: vec![TranscriptResult {
            is_final,
            alternatives: vec![TranscriptAlternative {
                transcript: text.to_string(),
                confidence: 0.9,
            }],
        }],
    })
}

/// Receive the next session event or panic after two seconds
pub async fn next_event<T>(rx: &mut mpsc::Receiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("session event channel closed")
}
