//! Streamed reply decoding
//!
//! Completion endpoints do not agree on a framing convention: plain SSE text,
//! JSON-wrapped deltas, and index-prefixed quoted chunks all occur in the
//! wild. The decoder reassembles raw byte chunks into lines and tries each
//! known shape in turn, passing visible text through and dropping anything
//! that looks like unparsed control metadata.

use serde_json::Value;

/// End-of-stream sentinel used by SSE-style endpoints
const DONE_SENTINEL: &str = "[DONE]";

/// Punctuation accepted by the plain-prose pass-through
const PROSE_PUNCTUATION: &str = ".,!?;:'\"()-\u{2019}\u{2026}&/%+*=@#$";

/// Incremental decoder for a framed reply byte stream
///
/// Holds at most one incomplete UTF-8 sequence and one partial,
/// newline-incomplete line between [`feed`] calls.
///
/// [`feed`]: Self::feed
#[derive(Debug, Default)]
pub struct StreamDecoder {
    /// Undecoded byte remainder (a multi-byte character split across chunks)
    carry: Vec<u8>,
    /// Decoded text without a trailing line terminator yet
    line_buf: String,
}

impl StreamDecoder {
    /// Create an empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of raw bytes, returning the text deltas it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(text) => {
                    self.line_buf.push_str(text);
                    self.carry.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // Safe slice: valid_up_to marks a UTF-8 boundary
                    if let Ok(text) = std::str::from_utf8(&self.carry[..valid]) {
                        self.line_buf.push_str(text);
                    }
                    match e.error_len() {
                        // Invalid sequence: drop it and keep decoding
                        Some(len) => {
                            self.carry.drain(..valid + len);
                        }
                        // Incomplete multi-byte tail, completed by the next chunk
                        None => {
                            self.carry.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }

        let mut deltas = Vec::new();
        while let Some(pos) = self.line_buf.find('\n') {
            let line: String = self.line_buf.drain(..=pos).collect();
            if let Some(delta) = process_line(line.trim_end_matches(['\n', '\r'])) {
                deltas.push(delta);
            }
        }
        deltas
    }

    /// Flush the unterminated remainder after the stream ends
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.line_buf);
        self.carry.clear();
        process_line(&rest).into_iter().collect()
    }
}

/// Process one frame line, yielding its text delta if it carries one
fn process_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let payload = if let Some(rest) = line.strip_prefix("data:") {
        rest.trim()
    } else if line.starts_with("event:")
        || line.starts_with("id:")
        || line.starts_with("retry:")
        || line.starts_with(':')
    {
        // SSE control fields and comments carry no text
        return None;
    } else {
        line
    };
    if payload == DONE_SENTINEL {
        return None;
    }

    extract_delta(payload)
}

/// Extract the text delta from a frame payload
///
/// Tries, in order: JSON object fields, an index-prefixed quoted string,
/// a bare quoted string, plain prose pass-through. Anything else is a
/// control frame and yields nothing.
fn extract_delta(payload: &str) -> Option<String> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(payload) {
        if let Some(text) = delta_from_object(&map) {
            return Some(text);
        }
        // Structured record without a recognized delta field: metadata frame
        return None;
    }

    if let Some(text) = unquote_indexed(payload) {
        return Some(text);
    }

    if payload.starts_with('"') && payload.ends_with('"') && payload.len() >= 2 {
        if let Ok(text) = serde_json::from_str::<String>(payload) {
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    if looks_like_prose(payload) {
        return Some(payload.to_string());
    }

    None
}

/// Read the delta from a parsed JSON object, checking known field names
fn delta_from_object(map: &serde_json::Map<String, Value>) -> Option<String> {
    // OpenAI-style choice list
    if let Some(text) = map
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("delta"))
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        return Some(text.to_string());
    }

    for key in ["content", "text", "delta", "response", "completion"] {
        if let Some(text) = map.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()) {
            return Some(text.to_string());
        }
    }

    map.get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Match `<digits>:"<text>"` and unescape the quoted part
fn unquote_indexed(payload: &str) -> Option<String> {
    let (index, rest) = payload.split_once(':')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let rest = rest.trim();
    if !(rest.starts_with('"') && rest.ends_with('"') && rest.len() >= 2) {
        return None;
    }
    serde_json::from_str::<String>(rest)
        .ok()
        .filter(|s| !s.is_empty())
}

/// Whether a line reads as plain prose rather than structured metadata
fn looks_like_prose(payload: &str) -> bool {
    payload.chars().all(|c| {
        c.is_alphanumeric() || c.is_whitespace() || PROSE_PUNCTUATION.contains(c)
    })
}
