//! Utterance aggregation
//!
//! Turns the raw interim/final event stream from a recognizer into discrete,
//! deduplicated utterances. Recognizers tend to re-fire final callbacks while
//! refining a segment, so a committed chunk is only the one that survived a
//! quiet period, and anything whose normalized text was already committed
//! recently is dropped.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::recognizer::TranscriptEvent;

/// Default quiet period before a staged final chunk commits
pub const DEFAULT_SILENCE_WINDOW: Duration = Duration::from_millis(1500);

/// Capacity of the recent-finals dedupe ring
const DEDUPE_CAPACITY: usize = 20;

/// Minimum utterance length for question detection
const MIN_QUESTION_LEN: usize = 10;

/// Lead words that mark an utterance as a question
const QUESTION_LEADS: &[&str] = &[
    "what", "why", "how", "when", "where", "which", "who", "whom", "whose",
    "can", "could", "should", "would", "is", "are", "do", "does", "did",
    "will", "may", "might",
];

/// Output emitted when a staged chunk commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatorOutput {
    /// A confirmed final chunk (raw, non-normalized text)
    FinalChunk(String),
    /// The full pending utterance qualified as a question
    Question(String),
}

/// Aggregates recognizer events into debounced, deduplicated utterances
pub struct UtteranceAggregator {
    silence_window: Duration,
    /// Final chunk waiting out the quiet period, with its commit deadline
    staged: Option<(String, Instant)>,
    /// Text spoken so far but not yet delivered as a completed turn
    pending: String,
    /// Normalized forms of recently committed chunks, FIFO
    recent_finals: VecDeque<String>,
}

impl UtteranceAggregator {
    /// Create an aggregator with the given silence window
    #[must_use]
    pub fn new(silence_window: Duration) -> Self {
        Self {
            silence_window,
            staged: None,
            pending: String::new(),
            recent_finals: VecDeque::with_capacity(DEDUPE_CAPACITY),
        }
    }

    /// Consume one recognizer event
    ///
    /// Returns the concatenated interim text for live preview, if any. Final
    /// text is not delivered here; it is staged and commits via [`poll`]
    /// once the silence window elapses without a newer final chunk.
    ///
    /// [`poll`]: Self::poll
    pub fn observe(&mut self, event: &TranscriptEvent, now: Instant) -> Option<String> {
        let mut interim = String::new();
        let mut final_text = String::new();

        for result in event.results.iter().skip(event.result_index) {
            let Some(alt) = result.alternatives.first() else {
                continue;
            };
            if result.is_final {
                final_text.push_str(&alt.transcript);
            } else {
                interim.push_str(&alt.transcript);
            }
        }

        let final_text = final_text.trim();
        if !final_text.is_empty() {
            tracing::debug!(chunk = %final_text, "staging final chunk");
            self.staged = Some((final_text.to_string(), now + self.silence_window));
        }

        if interim.is_empty() {
            None
        } else {
            Some(interim)
        }
    }

    /// Deadline at which the staged chunk commits, if one is staged
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.staged.as_ref().map(|(_, at)| *at)
    }

    /// Commit the staged chunk if its quiet period has elapsed
    ///
    /// Emits at most one `FinalChunk` and, when the pending utterance
    /// qualifies, a `Question` carrying the full pending text.
    pub fn poll(&mut self, now: Instant) -> Vec<AggregatorOutput> {
        let Some((chunk, deadline)) = self.staged.take() else {
            return Vec::new();
        };
        if now < deadline {
            self.staged = Some((chunk, deadline));
            return Vec::new();
        }

        let normalized = normalize(&chunk);
        if self.recent_finals.contains(&normalized) {
            tracing::debug!(chunk = %chunk, "duplicate final chunk suppressed");
            return Vec::new();
        }
        if self.recent_finals.len() >= DEDUPE_CAPACITY {
            self.recent_finals.pop_front();
        }
        self.recent_finals.push_back(normalized);

        if !self.pending.is_empty() {
            self.pending.push(' ');
        }
        self.pending.push_str(&chunk);

        let mut outputs = vec![AggregatorOutput::FinalChunk(chunk)];
        if is_question(&self.pending) {
            tracing::debug!(utterance = %self.pending, "question detected");
            outputs.push(AggregatorOutput::Question(self.pending.clone()));
        }
        outputs
    }

    /// Text accumulated but not yet delivered
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Take the pending utterance, clearing it
    pub fn take_pending(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    /// Cancel the staged chunk and clear pending text and the dedupe ring
    pub fn reset(&mut self) {
        self.staged = None;
        self.pending.clear();
        self.recent_finals.clear();
    }
}

impl Default for UtteranceAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_SILENCE_WINDOW)
    }
}

/// Normalize a chunk for duplicate suppression
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Heuristic question check: interrogative/auxiliary lead word plus a
/// minimum length guard against short fragments
#[must_use]
pub fn is_question(text: &str) -> bool {
    if text.chars().count() <= MIN_QUESTION_LEN {
        return false;
    }
    text.split_whitespace()
        .next()
        .is_some_and(|lead| QUESTION_LEADS.contains(&lead.to_lowercase().as_str()))
}
