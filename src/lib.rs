//! Parlance - Streaming voice chat client for LLM endpoints
//!
//! This library provides the core functionality for parlance:
//! - Utterance aggregation (silence debounce, dedupe, question detection)
//! - Format-tolerant decoding of streamed reply bytes
//! - Conversation history with explicit assistant-turn indices
//! - Session orchestration (auto-answer, abort, stalled-stream watchdog)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Recognizer                         │
//! │        speech events (interim / final / error)       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  ChatSession                         │
//! │   Aggregator  │  Conversation  │  StreamDecoder     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Completion endpoint                     │
//! │        streamed chat completions over HTTP           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod aggregator;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod decoder;
pub mod error;
pub mod recognizer;
pub mod session;

pub use aggregator::{AggregatorOutput, UtteranceAggregator};
pub use completion::CompletionClient;
pub use config::{Config, KeyStore};
pub use conversation::{ChatTurn, Conversation, Role};
pub use decoder::StreamDecoder;
pub use error::{Error, Result};
pub use recognizer::{
    ConsoleRecognizer, Recognizer, RecognizerError, RecognizerEvent, TranscriptAlternative,
    TranscriptEvent, TranscriptResult,
};
pub use session::{ChatSession, SessionCommand, SessionEvent, SessionHandle, StreamOutcome};
