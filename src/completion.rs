//! Chat completion client
//!
//! Thin wrapper over the hosted completion endpoint. The endpoint returns a
//! framed byte stream; the caller drains it through a
//! [`StreamDecoder`](crate::decoder::StreamDecoder).

use serde::Serialize;

use crate::conversation::{ChatTurn, Role};
use crate::{Error, Result};

/// Wire shape of one request message
#[derive(Serialize)]
struct RequestMessage<'a> {
    role: Role,
    content: &'a str,
}

/// Request body for a streaming chat completion
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    stream: bool,
}

/// Calls the hosted completion endpoint
pub struct CompletionClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl CompletionClient {
    /// Create a client for the given endpoint and model
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint URL is empty
    pub fn new(endpoint: String, model: String, api_key: Option<String>) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(Error::Config("completion endpoint required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
            api_key,
        })
    }

    /// Start a streaming completion over the given turns
    ///
    /// Returns the raw response; the body is a framed byte stream.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success status.
    pub async fn stream_chat(&self, turns: &[ChatTurn]) -> Result<reqwest::Response> {
        let body = CompletionRequest {
            model: &self.model,
            messages: turns
                .iter()
                .filter(|t| !(t.role == Role::Assistant && t.content.is_empty()))
                .map(|t| RequestMessage {
                    role: t.role,
                    content: &t.content,
                })
                .collect(),
            stream: true,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            turns = body.messages.len(),
            "starting completion request"
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "completion request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "completion endpoint error");
            return Err(Error::Completion(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        tracing::debug!(status = %status, "completion stream open");
        Ok(response)
    }
}
