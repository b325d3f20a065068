//! Session orchestration
//!
//! Glues the utterance aggregator, the conversation history, and the
//! completion client behind a single event loop. The loop listens on three
//! sources: recognizer events, the aggregator's commit deadline, and a
//! command channel for manual triggers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::{Notify, mpsc};

use crate::aggregator::{AggregatorOutput, UtteranceAggregator};
use crate::completion::CompletionClient;
use crate::config::{Config, RESTART_DELAY, SYSTEM_PROMPT};
use crate::conversation::Conversation;
use crate::decoder::StreamDecoder;
use crate::recognizer::{Recognizer, RecognizerEvent};
use crate::{Error, Result};

/// Event channel depth for UI consumers
const EVENT_CAPACITY: usize = 64;

/// Fallback select deadline when nothing is staged
const IDLE_TICK: Duration = Duration::from_secs(3600);

/// UI-facing session event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Live interim transcript, may be overwritten rapidly
    InterimPreview(String),
    /// A confirmed final chunk was committed
    FinalChunk(String),
    /// The pending utterance qualified as a question
    QuestionDetected(String),
    /// A completion call started streaming
    ReplyStarted,
    /// One streamed text delta
    ReplyDelta(String),
    /// The completion call finished (completed, aborted, or failed)
    ReplyFinished,
    /// Synthetic user-visible message (errors, fatal recognizer codes)
    Notice(String),
}

/// Command sent to a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Answer the pending utterance now
    Ask,
    /// End the session
    Stop,
}

/// How a reply stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Stream ran to completion
    Completed,
    /// Caller aborted mid-stream
    Aborted,
    /// Watchdog ceiling elapsed with the stream stalled
    Stalled,
}

/// Handle for controlling a running session from outside the loop
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    busy: Arc<AtomicBool>,
    aborted: Arc<AtomicBool>,
    abort_signal: Arc<Notify>,
}

impl SessionHandle {
    /// Request an answer for the pending utterance
    pub async fn ask(&self) {
        let _ = self.commands.send(SessionCommand::Ask).await;
    }

    /// Abort the in-flight completion call, if any
    ///
    /// Clears the busy flag immediately; no further deltas are appended.
    /// A no-op while no call is in flight.
    pub fn abort(&self) {
        if self.busy.swap(false, Ordering::SeqCst) {
            self.aborted.store(true, Ordering::SeqCst);
            self.abort_signal.notify_one();
            tracing::info!("abort requested");
        }
    }

    /// Whether a completion call is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Ask the session loop to end
    pub async fn stop(&self) {
        let _ = self.commands.send(SessionCommand::Stop).await;
    }
}

/// A single voice chat session
pub struct ChatSession {
    config: Config,
    conversation: Conversation,
    aggregator: UtteranceAggregator,
    client: CompletionClient,
    recognizer: Box<dyn Recognizer>,
    events: mpsc::Sender<SessionEvent>,
    commands: mpsc::Receiver<SessionCommand>,
    busy: Arc<AtomicBool>,
    aborted: Arc<AtomicBool>,
    abort_signal: Arc<Notify>,
}

impl ChatSession {
    /// Create a session with its control handle and event receiver
    ///
    /// # Errors
    ///
    /// Returns error if the completion client cannot be constructed
    pub fn new(
        config: Config,
        recognizer: Box<dyn Recognizer>,
    ) -> Result<(Self, SessionHandle, mpsc::Receiver<SessionEvent>)> {
        let client = CompletionClient::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.api_key.clone(),
        )?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(8);
        let busy = Arc::new(AtomicBool::new(false));
        let aborted = Arc::new(AtomicBool::new(false));
        let abort_signal = Arc::new(Notify::new());

        let handle = SessionHandle {
            commands: command_tx,
            busy: Arc::clone(&busy),
            aborted: Arc::clone(&aborted),
            abort_signal: Arc::clone(&abort_signal),
        };

        let session = Self {
            conversation: Conversation::new(SYSTEM_PROMPT, config.history_cap),
            aggregator: UtteranceAggregator::new(config.silence_window),
            client,
            recognizer,
            events: event_tx,
            commands: command_rx,
            busy,
            aborted,
            abort_signal,
            config,
        };

        Ok((session, handle, event_rx))
    }

    /// Run the session until stopped or a fatal recognizer error
    ///
    /// # Errors
    ///
    /// Returns error if the recognizer cannot start or fails fatally
    pub async fn run(mut self) -> Result<()> {
        let mut recognizer_events = self.recognizer.start().await?;
        tracing::info!("session listening");

        loop {
            let commit_staged = self.aggregator.deadline().is_some();
            let deadline = self
                .aggregator
                .deadline()
                .unwrap_or_else(|| Instant::now() + IDLE_TICK);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::Ask) => self.answer().await,
                    Some(SessionCommand::Stop) | None => break,
                },

                event = recognizer_events.recv() => match event {
                    Some(RecognizerEvent::Transcript(transcript)) => {
                        if let Some(preview) =
                            self.aggregator.observe(&transcript, Instant::now())
                        {
                            self.emit(SessionEvent::InterimPreview(preview)).await;
                        }
                    }
                    Some(RecognizerEvent::Error(code)) if code.is_fatal() => {
                        tracing::error!(%code, "fatal recognizer error");
                        self.emit(SessionEvent::Notice(code.to_string())).await;
                        self.recognizer.stop();
                        return Err(Error::Recognizer(code.to_string()));
                    }
                    Some(RecognizerEvent::Error(code)) => {
                        tracing::debug!(%code, "transient recognizer error");
                    }
                    Some(RecognizerEvent::Ended) | None => {
                        if !self.config.continuous {
                            break;
                        }
                        tokio::time::sleep(RESTART_DELAY).await;
                        match self.recognizer.start().await {
                            Ok(rx) => {
                                tracing::debug!("recognizer restarted");
                                recognizer_events = rx;
                            }
                            Err(e) => {
                                // Retry on the next Ended/closed-channel pass
                                tracing::warn!(error = %e, "recognizer restart failed");
                            }
                        }
                    }
                },

                () = tokio::time::sleep_until(deadline.into()), if commit_staged => {
                    for output in self.aggregator.poll(Instant::now()) {
                        match output {
                            AggregatorOutput::FinalChunk(chunk) => {
                                self.emit(SessionEvent::FinalChunk(chunk)).await;
                            }
                            AggregatorOutput::Question(utterance) => {
                                self.emit(SessionEvent::QuestionDetected(utterance)).await;
                                if self.config.auto_answer {
                                    self.answer().await;
                                }
                            }
                        }
                    }
                },
            }
        }

        self.recognizer.stop();
        tracing::info!("session stopped");
        Ok(())
    }

    /// Answer the pending utterance with a streamed completion call
    async fn answer(&mut self) {
        let question = self.aggregator.take_pending();
        if question.trim().is_empty() {
            tracing::debug!("nothing pending to answer");
            return;
        }

        self.conversation.push_user(question);
        let turn = self.conversation.open_assistant();
        self.aborted.store(false, Ordering::SeqCst);
        self.busy.store(true, Ordering::SeqCst);
        self.emit(SessionEvent::ReplyStarted).await;

        let result = self.stream_reply(turn).await;
        self.busy.store(false, Ordering::SeqCst);

        match result {
            Ok(StreamOutcome::Completed) => {}
            Ok(StreamOutcome::Aborted) => {
                tracing::info!("reply aborted");
            }
            Ok(StreamOutcome::Stalled) => {
                tracing::warn!("reply stream stalled, giving up");
                self.emit(SessionEvent::Notice("reply timed out".to_string()))
                    .await;
            }
            Err(e) => {
                let notice = format!("[error: {e}]");
                self.conversation.append_delta(turn, &notice);
                self.emit(SessionEvent::Notice(notice)).await;
            }
        }

        self.conversation.close_assistant();
        self.emit(SessionEvent::ReplyFinished).await;
    }

    /// Open the completion stream and drain it into the given turn
    async fn stream_reply(&mut self, turn: usize) -> Result<StreamOutcome> {
        let response = self.client.stream_chat(self.conversation.turns()).await?;
        let body = response.bytes_stream();
        self.pump_stream(body, turn).await
    }

    /// Drain a reply byte stream through the decoder into the open turn
    ///
    /// Select loop over the next chunk, the abort signal, and the stalled
    /// stream watchdog. Factored over any byte stream so tests can drive it
    /// with a channel-backed source.
    pub(crate) async fn pump_stream<S, E>(
        &mut self,
        stream: S,
        turn: usize,
    ) -> Result<StreamOutcome>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let mut stream = std::pin::pin!(stream);
        let mut decoder = StreamDecoder::new();
        let watchdog = tokio::time::Instant::now() + self.config.watchdog;

        loop {
            if self.aborted.swap(false, Ordering::SeqCst) {
                return Ok(StreamOutcome::Aborted);
            }

            tokio::select! {
                () = self.abort_signal.notified() => {
                    self.aborted.store(false, Ordering::SeqCst);
                    return Ok(StreamOutcome::Aborted);
                }

                () = tokio::time::sleep_until(watchdog) => {
                    return Ok(StreamOutcome::Stalled);
                }

                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for delta in decoder.feed(&bytes) {
                            self.conversation.append_delta(turn, &delta);
                            self.emit(SessionEvent::ReplyDelta(delta)).await;
                        }
                    }
                    Some(Err(e)) => {
                        return Err(Error::Completion(format!("stream error: {e}")));
                    }
                    None => {
                        for delta in decoder.finish() {
                            self.conversation.append_delta(turn, &delta);
                            self.emit(SessionEvent::ReplyDelta(delta)).await;
                        }
                        return Ok(StreamOutcome::Completed);
                    }
                },
            }
        }
    }

    /// Current conversation history
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    async fn emit(&self, event: SessionEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!("session event receiver dropped");
        }
    }
}
