//! The corpus summary handed to the planner in place of the raw corpus:
//! counts and shape, never document text.

use chrono::{DateTime, Utc};
use qe_core::Corpus;
use serde::Serialize;

/// One sender's share of the corpus.
#[derive(Debug, Clone, Serialize)]
pub struct SenderCount {
    /// The sender's name.
    pub name: String,
    /// How many documents they sent.
    pub count: usize,
}

/// What the planner is told about the corpus, instead of the documents
/// themselves.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusSummary {
    /// Total document count.
    pub total_documents: usize,
    /// Senders and their message counts, in first-seen order.
    pub senders: Vec<SenderCount>,
    /// Earliest/latest timestamp in the corpus, if non-empty.
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Number of distinct threads.
    pub thread_count: usize,
    /// Whether a prior step in this session already computed `tone`
    /// labels — not derivable from the corpus itself (which carries no
    /// labels), so the caller supplies it.
    pub has_tone_analysis: bool,
}

/// Build a summary from `corpus`. `has_tone_analysis` reflects session
/// state the caller tracks, not anything stored on the corpus.
pub fn summarize(corpus: &Corpus, has_tone_analysis: bool) -> CorpusSummary {
    CorpusSummary {
        total_documents: corpus.len(),
        senders: corpus
            .senders()
            .into_iter()
            .map(|(name, count)| SenderCount { name, count })
            .collect(),
        date_range: corpus.date_range(),
        thread_count: corpus.thread_count(),
        has_tone_analysis,
    }
}
