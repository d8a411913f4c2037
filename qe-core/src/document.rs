//! The immutable document model and the read-only corpus it lives in.

use crate::id::{DocId, ThreadId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata attached to a document by the (out-of-scope) parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Who sent the message.
    pub sender: String,
    /// Who received the message.
    pub recipient: String,
    /// The conversation this message belongs to, if known.
    pub thread_id: Option<ThreadId>,
    /// Subject line, if the source format carries one.
    pub subject: Option<String>,
    /// Word count of `text`.
    pub word_count: u32,
    /// Position of this message within its thread, if known.
    pub message_number: Option<u32>,
}

/// An immutable conversational record. Documents are produced once by the
/// parser and never mutated by the engine — every operator that needs to
/// change something about a document's classification attaches a [`crate::label::Label`]
/// to a new [`crate::docset::DocSet`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier, stable across the lifetime of the corpus.
    pub id: DocId,
    /// Tag identifying which vendor report this document came from.
    pub source: String,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
    /// The message body.
    pub text: String,
    /// Structured metadata about the message.
    pub metadata: DocumentMetadata,
}

/// An ordered, read-only sequence of documents with unique ids.
///
/// The corpus is the input to an execution; it is never mutated by the
/// engine. Unlike a [`crate::docset::DocSet`], the corpus carries no labels
/// and no audit trail — it is just the fixed universe of documents.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    docs: Vec<Document>,
    by_id: HashMap<DocId, usize>,
    by_thread: HashMap<ThreadId, Vec<usize>>,
}

impl Corpus {
    /// Build a corpus from an ordered list of documents.
    ///
    /// Panics in debug builds if two documents share an id — the
    /// (out-of-scope) parser is responsible for id uniqueness, but a
    /// violation here would silently corrupt every downstream lookup.
    pub fn new(docs: Vec<Document>) -> Self {
        let mut by_id = HashMap::with_capacity(docs.len());
        let mut by_thread: HashMap<ThreadId, Vec<usize>> = HashMap::new();
        for (idx, doc) in docs.iter().enumerate() {
            debug_assert!(
                !by_id.contains_key(&doc.id),
                "duplicate document id in corpus: {}",
                doc.id
            );
            by_id.insert(doc.id.clone(), idx);
            if let Some(thread_id) = &doc.metadata.thread_id {
                by_thread.entry(thread_id.clone()).or_default().push(idx);
            }
        }
        Self {
            docs,
            by_id,
            by_thread,
        }
    }

    /// All documents in corpus order.
    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    /// Number of documents in the corpus.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the corpus has no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Look up a single document by id.
    pub fn get(&self, id: &DocId) -> Option<&Document> {
        self.by_id.get(id).map(|&idx| &self.docs[idx])
    }

    /// All documents sharing a thread id, in corpus order (not necessarily
    /// chronological — callers that need chronological order should sort).
    pub fn thread_documents(&self, thread_id: &ThreadId) -> Vec<&Document> {
        self.by_thread
            .get(thread_id)
            .map(|idxs| idxs.iter().map(|&i| &self.docs[i]).collect())
            .unwrap_or_default()
    }

    /// Distinct sender names present in the corpus, each with its message
    /// count, in first-seen order. Used to build the planner's corpus
    /// summary.
    pub fn senders(&self) -> Vec<(String, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        for doc in &self.docs {
            let entry = counts.entry(doc.metadata.sender.clone()).or_insert(0);
            if *entry == 0 {
                order.push(doc.metadata.sender.clone());
            }
            *entry += 1;
        }
        order
            .into_iter()
            .map(|name| {
                let count = counts[&name];
                (name, count)
            })
            .collect()
    }

    /// Inclusive `(earliest, latest)` timestamp range, or `None` if empty.
    pub fn date_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut iter = self.docs.iter().map(|d| d.timestamp);
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), ts| {
            (min.min(ts), max.max(ts))
        });
        Some((min, max))
    }

    /// Count of distinct thread ids present in the corpus.
    pub fn thread_count(&self) -> usize {
        self.by_thread.len()
    }
}
