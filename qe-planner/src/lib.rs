#![deny(missing_docs)]
//! # qe-planner — planner and synthesizer
//!
//! The two single-shot structured LLM calls that bracket plan execution:
//! the planner turns a query into a [`qe_core::Plan`], the synthesizer
//! turns an executed [`qe_core::DocSet`] into a cited answer.

/// The corpus summary handed to the planner in place of raw documents.
pub mod corpus_summary;
/// Planner-specific errors.
pub mod error;
/// The planner.
pub mod planner;
/// The synthesizer.
pub mod synthesizer;

pub use corpus_summary::{summarize, CorpusSummary, SenderCount};
pub use error::PlannerError;
pub use planner::Planner;
pub use synthesizer::{Citation, SynthesisResult, Synthesizer};
