//! Console transcript source
//!
//! Reads lines from stdin and replays each as one final transcript result,
//! so a session can be exercised without a speech engine. Also the reference
//! implementation of the [`Recognizer`] trait.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{
    Recognizer, RecognizerEvent, TranscriptAlternative, TranscriptEvent, TranscriptResult,
};
use crate::Result;

/// Event channel depth
const CHANNEL_CAPACITY: usize = 32;

/// Line-oriented recognizer over standard input
#[derive(Default)]
pub struct ConsoleRecognizer {
    reader: Option<JoinHandle<()>>,
}

impl ConsoleRecognizer {
    /// Create an idle console recognizer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Recognizer for ConsoleRecognizer {
    async fn start(&mut self) -> Result<mpsc::Receiver<RecognizerEvent>> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        let event = TranscriptEvent {
                            result_index: 0,
                            results: vec![TranscriptResult {
                                is_final: true,
                                alternatives: vec![TranscriptAlternative {
                                    transcript: trimmed.to_string(),
                                    confidence: 1.0,
                                }],
                            }],
                        };
                        if tx.send(RecognizerEvent::Transcript(event)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        let _ = tx.send(RecognizerEvent::Ended).await;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        let _ = tx.send(RecognizerEvent::Ended).await;
                        break;
                    }
                }
            }
        });

        self.reader = Some(handle);
        tracing::debug!("console recognizer started");
        Ok(rx)
    }

    fn stop(&mut self) {
        if let Some(handle) = self.reader.take() {
            handle.abort();
            tracing::debug!("console recognizer stopped");
        }
    }

    fn abort(&mut self) {
        self.stop();
    }

    fn is_active(&self) -> bool {
        self.reader.as_ref().is_some_and(|h| !h.is_finished())
    }
}
