//! Request adapter and compatibility fallback protocol.
//!
//! Chat-completion endpoints disagree on which parameters they accept: newer
//! model families reject `max_tokens` in favour of `max_completion_tokens`
//! (and vice versa on older gateways), some models only accept their default
//! sampling temperature, and busy models answer with rate limits. The
//! [`RequestAdapter`] owns all provider calls and repairs these rejections
//! with a bounded sequence of corrective retries instead of surfacing them
//! to the user.

use serde::Serialize;
use tracing::{debug, info};

use crate::ai::error::AiError;
use crate::ai::provider::OpenAiProvider;
use crate::ai::stream::ProgressReporter;
use crate::config::Config;

/// Maximum number of corrective retries before the last error is surfaced.
///
/// The budget is shared across all correction categories; the temperature
/// correction additionally applies at most once per request lineage.
pub const MAX_CORRECTIVE_RETRIES: u32 = 3;

/// Message role accepted by the chat-completion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction.
    System,
    /// User-supplied content.
    User,
}

/// One entry of the ordered message list sent to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The token-limit parameter under one of its two accepted field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLimit {
    /// Sent as `max_completion_tokens`.
    MaxCompletionTokens(u32),
    /// Sent as `max_tokens`.
    MaxTokens(u32),
}

impl TokenLimit {
    /// The numeric limit, independent of the field name.
    pub fn value(self) -> u32 {
        match self {
            TokenLimit::MaxCompletionTokens(v) | TokenLimit::MaxTokens(v) => v,
        }
    }

    /// The same limit under the alternate field name.
    pub fn swapped(self) -> Self {
        match self {
            TokenLimit::MaxCompletionTokens(v) => TokenLimit::MaxTokens(v),
            TokenLimit::MaxTokens(v) => TokenLimit::MaxCompletionTokens(v),
        }
    }

    /// Wire name of the field currently in use.
    pub fn field_name(self) -> &'static str {
        match self {
            TokenLimit::MaxCompletionTokens(_) => "max_completion_tokens",
            TokenLimit::MaxTokens(_) => "max_tokens",
        }
    }
}

/// One generation request. Immutable per attempt; corrective retries derive
/// a new request rather than mutating the original.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered message list.
    pub messages: Vec<ChatMessage>,
    /// Token-limit parameter and field name.
    pub token_limit: TokenLimit,
    /// Sampling temperature, if the model should not use its default.
    pub temperature: Option<f32>,
    /// Reasoning-effort hint for models that accept one.
    pub reasoning_effort: Option<String>,
    /// Model substituted on rate limits, when configured.
    pub fallback_model: Option<String>,
}

impl GenerationRequest {
    /// Creates a request with no temperature, effort hint, or fallback.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, token_limit: TokenLimit) -> Self {
        Self {
            model: model.into(),
            messages,
            token_limit,
            temperature: None,
            reasoning_effort: None,
            fallback_model: None,
        }
    }

    /// Builds a request from the resolved configuration.
    ///
    /// The token limit starts under the `max_completion_tokens` name; the
    /// fallback protocol rewrites it if the endpoint disagrees.
    pub fn from_config(config: &Config, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: config.model.clone(),
            messages,
            token_limit: TokenLimit::MaxCompletionTokens(config.max_tokens),
            temperature: config.temperature,
            reasoning_effort: config.reasoning_effort.clone(),
            fallback_model: config.fallback_model.clone(),
        }
    }

    fn without_temperature(&self) -> Self {
        let mut derived = self.clone();
        derived.temperature = None;
        derived
    }

    fn with_swapped_token_limit(&self) -> Self {
        let mut derived = self.clone();
        derived.token_limit = self.token_limit.swapped();
        derived
    }

    fn with_model(&self, model: String) -> Self {
        let mut derived = self.clone();
        derived.model = model;
        derived
    }
}

/// A correction derived from classifying a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Correction {
    DropTemperature,
    SwapTokenLimit,
    SwitchModel(String),
}

/// Classifies an error against the request that produced it.
///
/// Precedence matters: the first matching rule wins.
fn classify(error: &AiError, request: &GenerationRequest) -> Option<Correction> {
    if request.temperature.is_some() && error.rejects_temperature() {
        return Some(Correction::DropTemperature);
    }
    if error.rejects_param(request.token_limit.field_name()) {
        return Some(Correction::SwapTokenLimit);
    }
    if error.is_rate_limit() {
        if let Some(fallback) = &request.fallback_model {
            if fallback != &request.model {
                return Some(Correction::SwitchModel(fallback.clone()));
            }
        }
    }
    None
}

/// Owns all calls to the generation provider.
pub struct RequestAdapter {
    provider: OpenAiProvider,
    stream: bool,
    quiet: bool,
}

impl RequestAdapter {
    /// Creates an adapter over a provider.
    ///
    /// `stream` selects the streaming response mode; `quiet` suppresses
    /// progress output without changing functional behaviour.
    pub fn new(provider: OpenAiProvider, stream: bool, quiet: bool) -> Self {
        Self {
            provider,
            stream,
            quiet,
        }
    }

    /// Creates an adapter from the resolved configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            OpenAiProvider::new(config.api_key.clone(), config.base_url.clone()),
            config.stream,
            config.quiet,
        )
    }

    /// Sends a request, applying corrective retries for parameter
    /// incompatibilities and rate limits, and returns the final text.
    pub async fn send(&self, request: GenerationRequest) -> Result<String, AiError> {
        let mut request = request;
        let mut attempts: u32 = 0;
        let mut temperature_dropped = false;

        loop {
            debug!(
                model = %request.model,
                token_field = request.token_limit.field_name(),
                temperature = ?request.temperature,
                attempts,
                "sending generation request"
            );

            let result = if self.stream {
                self.provider
                    .stream_completion(&request, ProgressReporter::new(self.quiet))
                    .await
            } else {
                self.provider.complete(&request).await
            };

            let error = match result {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => AiError::EmptyCompletion,
                Err(e) => e,
            };

            attempts += 1;
            if attempts > MAX_CORRECTIVE_RETRIES {
                debug!("corrective retry budget exhausted");
                return Err(surface(error, &request));
            }

            match classify(&error, &request) {
                Some(Correction::DropTemperature) if !temperature_dropped => {
                    temperature_dropped = true;
                    info!(model = %request.model, "model rejected temperature; retrying without it");
                    request = request.without_temperature();
                }
                Some(Correction::SwapTokenLimit) => {
                    let rejected = request.token_limit.field_name();
                    request = request.with_swapped_token_limit();
                    info!(
                        rejected,
                        using = request.token_limit.field_name(),
                        "token-limit field rejected; retrying with alternate name"
                    );
                }
                Some(Correction::SwitchModel(model)) => {
                    info!(fallback = %model, "rate limited; retrying with fallback model");
                    request = request.with_model(model);
                }
                _ => return Err(surface(error, &request)),
            }
        }
    }
}

/// Converts a terminal error into the form callers see.
///
/// Raw rate-limit rejections become [`AiError::RateLimited`] carrying the
/// model that hit the limit; everything else passes through.
fn surface(error: AiError, request: &GenerationRequest) -> AiError {
    if error.is_rate_limit() && !matches!(error, AiError::RateLimited { .. }) {
        return AiError::RateLimited {
            model: request.model.clone(),
        };
    }
    error
}
