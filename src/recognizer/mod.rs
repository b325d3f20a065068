//! Speech recognizer abstraction
//!
//! The hosted recognition engine is an injected capability rather than
//! ambient state: anything that can start a session and push
//! [`RecognizerEvent`]s over a channel works, which is also how tests
//! substitute a scripted event source.

mod console;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use console::ConsoleRecognizer;

use crate::Result;

/// One weighted transcript hypothesis
#[derive(Debug, Clone)]
pub struct TranscriptAlternative {
    /// Recognized text
    pub transcript: String,
    /// Engine confidence, 0.0 to 1.0
    pub confidence: f32,
}

/// One recognized segment, provisional or settled
#[derive(Debug, Clone)]
pub struct TranscriptResult {
    /// True once the engine will not revise this segment further
    pub is_final: bool,
    /// Ordered hypotheses, best first
    pub alternatives: Vec<TranscriptAlternative>,
}

/// One recognizer callback payload
#[derive(Debug, Clone)]
pub struct TranscriptEvent {
    /// Cursor: results before this index were delivered previously
    pub result_index: usize,
    /// Ordered results from the start of the session
    pub results: Vec<TranscriptResult>,
}

/// Categorical recognizer error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognizerError {
    /// Microphone permission denied
    NotAllowed,
    /// No microphone or capture failure
    AudioCapture,
    /// Recognition service unavailable on this host
    ServiceUnavailable,
    /// Nothing was said before the engine gave up
    NoSpeech,
    /// Session was aborted mid-utterance
    Aborted,
    /// Transient network problem reaching the engine
    Network,
}

impl RecognizerError {
    /// Whether this error ends the listening session for good
    ///
    /// Fatal errors require explicit user action (permission re-grant,
    /// hardware fix); the rest are recoverable and the session restarts.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::NotAllowed | Self::AudioCapture | Self::ServiceUnavailable
        )
    }
}

impl std::fmt::Display for RecognizerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotAllowed => "microphone permission denied",
            Self::AudioCapture => "audio capture failed",
            Self::ServiceUnavailable => "recognition service unavailable",
            Self::NoSpeech => "no speech detected",
            Self::Aborted => "recognition aborted",
            Self::Network => "network error",
        };
        f.write_str(s)
    }
}

/// Event pushed by a recognizer session
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// Interim/final transcript results
    Transcript(TranscriptEvent),
    /// Categorical error; fatal codes end the session
    Error(RecognizerError),
    /// The engine ended the session (may be restarted)
    Ended,
}

/// Trait for speech event sources
///
/// `Send + Sync` so a boxed recognizer can live inside a session whose
/// `run()` future is handed to `tokio::spawn`.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Start a recognition session, returning its event stream
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be started
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>>;

    /// Stop gracefully, letting buffered results flush
    fn stop(&mut self);

    /// Abort immediately, discarding buffered results
    fn abort(&mut self);

    /// Whether a session is currently active
    fn is_active(&self) -> bool;
}
