//! Planner-specific errors. The synthesizer, by contract, never raises —
//! its failures degrade to a plain-text fallback instead.

use thiserror::Error;

/// Errors from producing a plan.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The underlying provider call failed.
    #[error("provider call failed: {0}")]
    ProviderFailed(#[from] qe_provider::ProviderError),

    /// The model's output did not parse as the plan wire format, or parsed
    /// into a structurally invalid plan (duplicate keys, forward references).
    #[error("invalid plan response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            PlannerError::InvalidResponse("bad json".into()).to_string(),
            "invalid plan response: bad json"
        );
    }
}
