//! OpenAI-compatible chat-completion client.
//!
//! Works against any endpoint exposing `/v1/chat/completions`, including
//! gateways that add the non-standard `reasoning_content` field for
//! reasoning models.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::adapter::{ChatMessage, GenerationRequest, TokenLimit};
use crate::ai::error::AiError;
use crate::ai::stream::{ProgressReporter, StreamAggregator, StreamDelta};

/// Wire shape of a chat-completion request.
#[derive(Serialize, Debug)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
    stream: bool,
}

impl<'a> WireRequest<'a> {
    fn build(request: &'a GenerationRequest, stream: bool) -> Self {
        let (max_tokens, max_completion_tokens) = match request.token_limit {
            TokenLimit::MaxTokens(v) => (Some(v), None),
            TokenLimit::MaxCompletionTokens(v) => (None, Some(v)),
        };
        Self {
            model: &request.model,
            messages: &request.messages,
            max_tokens,
            max_completion_tokens,
            temperature: request.temperature,
            reasoning_effort: request.reasoning_effort.as_deref(),
            stream,
        }
    }
}

/// Non-streaming response message.
#[derive(Deserialize, Debug)]
struct ResponseMessage {
    content: Option<String>,
    // Intermediate reasoning; present on some gateways, never part of the
    // final text.
    #[allow(dead_code)]
    reasoning_content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ResponseChoice {
    message: ResponseMessage,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

/// Streaming delta payload.
#[derive(Deserialize, Debug, Default)]
struct WireDelta {
    content: Option<String>,
    reasoning_content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<WireDelta>,
}

#[derive(Deserialize, Debug)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

/// OpenAI-style error body.
#[derive(Deserialize, Debug)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize, Debug)]
struct ErrorDetail {
    message: Option<String>,
    code: Option<String>,
    param: Option<String>,
}

/// HTTP client for an OpenAI-compatible endpoint.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Creates a provider for the given credentials and base URL.
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Builds the full chat-completions URL from the base URL.
    fn api_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1/chat/completions")
    }

    async fn post(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, AiError> {
        let wire = WireRequest::build(request, stream);
        let url = self.api_url();
        debug!(%url, model = %request.model, stream, "posting chat completion");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&wire)
            .send()
            .await
            .map_err(|e| AiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }

        Ok(response)
    }

    /// Sends a non-streaming request and returns the answer text.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, AiError> {
        let response = self.post(request, false).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        debug!(response_len = text.len(), "received chat completion");
        Ok(text)
    }

    /// Sends a streaming request, feeding deltas through an aggregator, and
    /// returns the joined final content.
    pub async fn stream_completion(
        &self,
        request: &GenerationRequest,
        reporter: ProgressReporter,
    ) -> Result<String, AiError> {
        let response = self.post(request, true).await?;

        let mut aggregator = StreamAggregator::new(reporter);
        let mut body_stream = response.bytes_stream();
        let mut buffer = String::new();

        'stream: while let Some(chunk) = body_stream.next().await {
            let chunk = chunk.map_err(|e| AiError::Network(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim_end_matches('\r').to_string();
                buffer.drain(..=newline);

                let Some(delta) = parse_sse_line(&line)? else {
                    if line.trim() == "data: [DONE]" {
                        break 'stream;
                    }
                    continue;
                };
                aggregator.push(delta);
            }
        }

        Ok(aggregator.finish())
    }
}

/// Parses one SSE line into a delta.
///
/// Returns `Ok(None)` for blank lines, comments, and the `[DONE]` sentinel.
fn parse_sse_line(line: &str) -> Result<Option<StreamDelta>, AiError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| AiError::InvalidResponse(format!("bad stream chunk: {e}")))?;

    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .unwrap_or_default();

    Ok(Some(StreamDelta {
        content: delta.content,
        reasoning: delta.reasoning_content,
    }))
}

/// Maps an error response to the adapter's error taxonomy.
fn error_from_response(status: u16, body: &str) -> AiError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error);

    let (message, code, param) = match detail {
        Some(d) => (
            d.message.unwrap_or_else(|| body.to_string()),
            d.code,
            d.param,
        ),
        None => (body.to_string(), None, None),
    };

    AiError::Api {
        status,
        message,
        code,
        param,
    }
}
