//! Abstract structured-generation provider interface.
//!
//! This crate defines the boundary between the query engine core and
//! whatever large-language-model backend answers its structured-generation
//! calls (Tier-3 operators, the planner, the synthesizer). No concrete SDK
//! lives here — only the [`provider::Provider`] trait, its request/response
//! types, a price table for turning token usage into dollars, and (behind
//! `test-util`) a deterministic fake for exercising callers without a
//! network.
#![deny(missing_docs)]

/// Request/response types shared by every [`Provider`](provider::Provider).
pub mod types;

/// The [`Provider`](provider::Provider) trait and its error type.
pub mod provider;

/// Static per-model pricing.
pub mod price;

/// A deterministic, queueable `Provider` test double. Requires the
/// `test-util` feature.
#[cfg(feature = "test-util")]
pub mod fake;

pub use price::{ModelPrice, PriceTable};
pub use provider::{Provider, ProviderError};
pub use types::{GenerateRequest, GenerateResponse, ReasoningEffort, TokenUsage};

#[cfg(feature = "test-util")]
pub use fake::FakeProvider;
