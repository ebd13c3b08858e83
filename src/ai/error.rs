//! Error taxonomy for the generation API layer.

use thiserror::Error;

/// Errors produced while talking to the chat-completion endpoint.
///
/// [`AiError::Api`] carries the structured fields of an OpenAI-style error
/// body when the provider supplies them; the fallback protocol in
/// [`crate::ai::RequestAdapter`] classifies these to decide whether a
/// corrective retry applies.
#[derive(Error, Debug)]
pub enum AiError {
    /// The provider rejected the request with an error payload.
    #[error("API request failed: HTTP {status}: {message}")]
    Api {
        /// HTTP status code of the rejection.
        status: u16,
        /// Human-readable message from the error body (or raw body text).
        message: String,
        /// Machine-readable error code, e.g. `unsupported_parameter`.
        code: Option<String>,
        /// The request parameter the error refers to, when identified.
        param: Option<String>,
    },

    /// The provider signalled rate limiting for the requested model.
    #[error("rate limit exceeded for model '{model}'")]
    RateLimited {
        /// Model that hit the limit.
        model: String,
    },

    /// The request completed but the model produced no usable text.
    #[error("the model returned no content")]
    EmptyCompletion,

    /// Network-level failure before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The response arrived but could not be decoded.
    #[error("invalid response format: {0}")]
    InvalidResponse(String),
}

impl AiError {
    /// Returns true when this error reports `param` as an unsupported or
    /// invalid request parameter.
    pub(crate) fn rejects_param(&self, param: &str) -> bool {
        match self {
            AiError::Api {
                code,
                param: err_param,
                message,
                ..
            } => {
                if err_param.as_deref() == Some(param) {
                    return matches!(
                        code.as_deref(),
                        Some("unsupported_parameter") | Some("invalid_request_error") | None
                    ) || message.contains("nsupported");
                }
                // Some gateways omit the structured `param` field and only
                // name the offending parameter in the message text.
                message.contains(param)
                    && (message.contains("nsupported") || message.contains("not supported"))
            }
            _ => false,
        }
    }

    /// Returns true when this error reports the temperature *value* as
    /// unsupported for the selected model.
    pub(crate) fn rejects_temperature(&self) -> bool {
        match self {
            AiError::Api { code, param, message, .. } => {
                if param.as_deref() == Some("temperature") {
                    return true;
                }
                code.as_deref() == Some("unsupported_value") && message.contains("temperature")
                    || message.contains("temperature")
                        && (message.contains("nsupported") || message.contains("does not support"))
            }
            _ => false,
        }
    }

    /// Returns true for rate-limit rejections.
    pub(crate) fn is_rate_limit(&self) -> bool {
        match self {
            AiError::RateLimited { .. } => true,
            AiError::Api { status, code, .. } => {
                *status == 429 || code.as_deref() == Some("rate_limit_exceeded")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, message: &str, code: Option<&str>, param: Option<&str>) -> AiError {
        AiError::Api {
            status,
            message: message.to_string(),
            code: code.map(String::from),
            param: param.map(String::from),
        }
    }

    #[test]
    fn rejects_param_structured() {
        let err = api(
            400,
            "Unsupported parameter: 'max_tokens' is not supported with this model.",
            Some("unsupported_parameter"),
            Some("max_tokens"),
        );
        assert!(err.rejects_param("max_tokens"));
        assert!(!err.rejects_param("max_completion_tokens"));
    }

    #[test]
    fn rejects_param_message_only() {
        let err = api(
            400,
            "max_completion_tokens is unsupported on this endpoint",
            None,
            None,
        );
        assert!(err.rejects_param("max_completion_tokens"));
    }

    #[test]
    fn rejects_temperature_value() {
        let err = api(
            400,
            "Unsupported value: 'temperature' does not support 0.2 with this model.",
            Some("unsupported_value"),
            Some("temperature"),
        );
        assert!(err.rejects_temperature());
        assert!(!err.is_rate_limit());
    }

    #[test]
    fn rate_limit_by_status() {
        let err = api(429, "Too Many Requests", None, None);
        assert!(err.is_rate_limit());
    }

    #[test]
    fn network_error_matches_nothing() {
        let err = AiError::Network("connection refused".to_string());
        assert!(!err.rejects_param("max_tokens"));
        assert!(!err.rejects_temperature());
        assert!(!err.is_rate_limit());
    }
}
