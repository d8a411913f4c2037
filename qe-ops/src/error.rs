//! Operator runtime errors.

use thiserror::Error;

/// Errors raised by Tier-1/Tier-3 operator execution.
///
/// Every variant here is non-fatal from the executor's point of view — the
/// executor always has the option of passing the input `DocSet` through
/// unchanged and recording `status: error` in the trace.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum OperatorError {
    /// A regular expression failed to compile.
    #[error("regex compile failed: {0}")]
    RegexCompile(String),

    /// A referenced document id was not present in the corpus.
    #[error("document not found in corpus: {0}")]
    DocNotFound(String),

    /// The operator's arguments did not match its expected shape.
    #[error("invalid arguments for {op}: {message}")]
    InvalidArgs {
        /// Name of the operator that rejected its arguments.
        op: String,
        /// What was wrong.
        message: String,
    },

    /// The provider call underlying a Tier-3 operator failed.
    #[error("provider call failed: {0}")]
    ProviderFailed(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            OperatorError::RegexCompile("unterminated [".into()).to_string(),
            "regex compile failed: unterminated ["
        );
        assert_eq!(
            OperatorError::InvalidArgs {
                op: "top_k".into(),
                message: "missing k".into(),
            }
            .to_string(),
            "invalid arguments for top_k: missing k"
        );
    }
}
