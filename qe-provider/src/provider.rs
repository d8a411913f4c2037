//! The abstract structured-generation provider interface.
//!
//! The core depends on nothing else from whatever LLM backend is behind
//! this trait. Concrete SDK integrations (Anthropic, OpenAI, a local
//! model) live outside the core entirely.

use crate::types::{GenerateRequest, GenerateResponse};
use std::future::Future;
use thiserror::Error;

/// Errors from structured-generation providers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP or network request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Provider rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Authentication/authorization failed.
    #[error("auth failed: {0}")]
    AuthFailed(String),

    /// The request timed out before the provider responded.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The provider's `output_text` did not parse as JSON matching the
    /// requested schema.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited | ProviderError::RequestFailed(_) | ProviderError::Timeout(_)
        )
    }
}

/// Abstract text-generation interface returning structured JSON output
/// against a caller-supplied schema.
///
/// Uses RPITIT and is intentionally NOT object-safe — implementations are
/// generic parameters on the callers that need them (Tier-3 operators, the
/// planner, the synthesizer), not trait objects. The object-safe boundary
/// lives one layer up, in the operator registry.
pub trait Provider: Send + Sync {
    /// A short name for trace/log attribution (e.g. `"anthropic"`,
    /// `"fake"`), independent of which model was requested.
    fn name(&self) -> &str;

    /// Generate structured output for `request`. Implementations must
    /// honor a per-call timeout and populate `usage` whenever the backend
    /// reports it.
    fn generate_structured(
        &self,
        request: GenerateRequest,
    ) -> impl Future<Output = Result<GenerateResponse, ProviderError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        assert_eq!(
            ProviderError::RequestFailed("timeout".into()).to_string(),
            "request failed: timeout"
        );
        assert_eq!(ProviderError::RateLimited.to_string(), "rate limited");
        assert_eq!(ProviderError::Timeout(5000).to_string(), "timed out after 5000ms");
    }

    #[test]
    fn provider_error_retryable() {
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(ProviderError::RequestFailed("x".into()).is_retryable());
        assert!(ProviderError::Timeout(100).is_retryable());
        assert!(!ProviderError::AuthFailed("bad key".into()).is_retryable());
        assert!(!ProviderError::InvalidResponse("bad json".into()).is_retryable());
    }
}
