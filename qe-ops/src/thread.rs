//! The thread grouper: flattens a thread's documents into one rendered
//! transcript for thread-level classification and extraction calls.
//!
//! A narrowing filter determines which threads are relevant; the model
//! must still see both sides of each conversation, so grouping always
//! hydrates the **full** thread from the corpus, not just the documents
//! that survived the DocSet's filters so far.

use qe_core::{Corpus, DocSet, Document, ThreadId};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A conversation hydrated from the corpus for Tier-3 thread-unit calls.
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    /// The conversation this group represents.
    pub thread_id: ThreadId,
    /// Every corpus document sharing `thread_id`, chronologically ordered.
    pub messages: Vec<Arc<Document>>,
    /// Which of `messages`' ids are present in the DocSet that produced
    /// this group — used for label propagation.
    pub docset_message_ids: BTreeSet<String>,
    /// The fixed-format text block handed to the model.
    pub rendered: String,
    /// `ceil(len(rendered) / 4)`, a cheap proxy for token count.
    pub token_estimate: usize,
}

/// Groups `docset`'s documents by thread, hydrating full-thread context
/// from `corpus`.
///
/// Threads with no `thread_id` (direct messages) are skipped — there is
/// nothing to group.
pub fn group_by_thread(docset: &DocSet, corpus: &Corpus) -> Vec<ThreadGroup> {
    let mut thread_ids: Vec<ThreadId> = Vec::new();
    let mut seen = BTreeSet::new();
    for doc in docset.documents() {
        if let Some(thread_id) = &doc.metadata.thread_id {
            if seen.insert(thread_id.clone()) {
                thread_ids.push(thread_id.clone());
            }
        }
    }

    let docset_ids: BTreeSet<String> = docset
        .documents()
        .iter()
        .map(|d| d.id.as_str().to_string())
        .collect();

    thread_ids
        .into_iter()
        .map(|thread_id| build_group(&thread_id, corpus, &docset_ids))
        .collect()
}

fn build_group(thread_id: &ThreadId, corpus: &Corpus, docset_ids: &BTreeSet<String>) -> ThreadGroup {
    let mut messages: Vec<Arc<Document>> = corpus
        .thread_documents(thread_id)
        .into_iter()
        .cloned()
        .map(Arc::new)
        .collect();
    messages.sort_by_key(|d| d.timestamp);

    let docset_message_ids = messages
        .iter()
        .filter(|d| docset_ids.contains(d.id.as_str()))
        .map(|d| d.id.as_str().to_string())
        .collect();

    let rendered = render_thread(thread_id, &messages);
    let token_estimate = rendered.len().div_ceil(4);

    ThreadGroup {
        thread_id: thread_id.clone(),
        messages,
        docset_message_ids,
        rendered,
        token_estimate,
    }
}

const SEPARATOR: &str = "────────────────────────────";

fn render_thread(thread_id: &ThreadId, messages: &[Arc<Document>]) -> String {
    let mut out = String::new();
    out.push_str(&format!("THREAD: {thread_id} ({} messages)\n", messages.len()));
    out.push_str(SEPARATOR);
    out.push('\n');
    for msg in messages {
        out.push_str(&format!(
            "[{}] {} — {}\n{}\n\n",
            msg.id,
            msg.metadata.sender,
            msg.timestamp.to_rfc3339(),
            msg.text
        ));
    }
    out.push_str(SEPARATOR);
    out
}
