//! Request/response types for the structured-generation interface.

use serde::{Deserialize, Serialize};

/// How much reasoning effort the caller wants the model to spend. Callers
/// route simple well-known schemas to `Low` and custom/complex schemas to
/// `Medium` or `High`; the provider decides what that means for its own
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// Cheapest, fastest, least deliberate.
    Low,
    /// Default effort for most classification/extraction calls.
    Medium,
    /// Highest effort, reserved for ambiguous custom schemas.
    High,
}

impl Default for ReasoningEffort {
    fn default() -> Self {
        ReasoningEffort::Medium
    }
}

/// A request to generate structured JSON output conforming to a schema.
///
/// This is the one shape every LLM-backed caller in the core speaks:
/// Tier-3 operators, the planner, and the synthesizer all build one of
/// these and hand it to a [`crate::provider::Provider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier; interpretation is provider-specific.
    pub model: String,
    /// System-level instructions framing the task.
    pub instructions: String,
    /// The task-specific input (rendered thread, document text, query, …).
    pub input: String,
    /// How much reasoning effort to spend.
    pub reasoning_effort: ReasoningEffort,
    /// JSON Schema the output must conform to.
    pub json_schema: serde_json::Value,
}

/// Token usage for a single call, when the provider can report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
}

/// Response from a structured-generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Raw text output. Expected (but not guaranteed) to be JSON matching
    /// the request's `json_schema` — callers must handle parse failure.
    pub output_text: String,
    /// Usage counts, when known. `None` means the caller must estimate.
    pub usage: Option<TokenUsage>,
}
