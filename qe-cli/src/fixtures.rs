//! A small in-memory sample corpus for the demo binary. Real corpus
//! ingestion (PDF parsing, message threading from an export format) is out
//! of scope; this crate only exercises the planning/execution/synthesis
//! pipeline.

use chrono::{DateTime, Utc};
use qe_core::{Corpus, DocId, Document, DocumentMetadata, ThreadId};

fn doc(id: &str, thread: &str, sender: &str, recipient: &str, ts: &str, number: u32, text: &str) -> Document {
    Document {
        id: DocId::from(id),
        source: "sample-export".into(),
        timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
        text: text.into(),
        metadata: DocumentMetadata {
            sender: sender.into(),
            recipient: recipient.into(),
            thread_id: Some(ThreadId::from(thread)),
            subject: None,
            word_count: text.split_whitespace().count() as u32,
            message_number: Some(number),
        },
    }
}

/// A fixed two-sender, two-thread corpus for demo runs.
pub fn sample_corpus() -> Corpus {
    let docs = vec![
        doc(
            "doc-001",
            "t-pickup",
            "Sarah Mitchell",
            "Tom Mitchell",
            "2024-01-03T08:15:00Z",
            1,
            "Can we talk about pickup times for next week?",
        ),
        doc(
            "doc-002",
            "t-pickup",
            "Tom Mitchell",
            "Sarah Mitchell",
            "2024-01-03T09:02:00Z",
            2,
            "Sure, I can do Friday at 5pm instead of 6.",
        ),
        doc(
            "doc-003",
            "t-pickup",
            "Sarah Mitchell",
            "Tom Mitchell",
            "2024-01-03T09:10:00Z",
            3,
            "That works. I'll let the lawyer know the schedule is settled.",
        ),
        doc(
            "doc-004",
            "t-expense",
            "Tom Mitchell",
            "Sarah Mitchell",
            "2024-02-11T14:00:00Z",
            4,
            "The orthodontist bill came to $250, can you send half?",
        ),
        doc(
            "doc-005",
            "t-expense",
            "Sarah Mitchell",
            "Tom Mitchell",
            "2024-02-11T18:45:00Z",
            5,
            "I already paid my share of that last month. I disagree this is owed.",
        ),
        doc(
            "doc-006",
            "t-expense",
            "Tom Mitchell",
            "Sarah Mitchell",
            "2024-02-11T19:02:00Z",
            6,
            "Let's just split the $250 evenly going forward and move on.",
        ),
        doc(
            "doc-007",
            "t-school",
            "Sarah Mitchell",
            "Tom Mitchell",
            "2024-03-01T07:30:00Z",
            7,
            "Parent-teacher conference is on the 14th at 4pm.",
        ),
        doc(
            "doc-008",
            "t-school",
            "Tom Mitchell",
            "Sarah Mitchell",
            "2024-03-01T07:40:00Z",
            8,
            "Got it, I'll be there.",
        ),
    ];
    Corpus::new(docs)
}
