//! Label polymorphism: a document's classification or extraction result.
//!
//! A label's `value` can be a simple string, a compound boolean+details
//! object, or a list of extraction items. Modeled as a tagged union per
//! the "Label polymorphism" design note, with accessor methods instead of
//! forcing every caller to match on the variant.

use crate::id::{DocId, ThreadId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A half-open character range into a document's `text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start offset, inclusive.
    pub start: usize,
    /// End offset, exclusive.
    pub end: usize,
}

impl Span {
    /// Whether this span is well-formed against a text of the given length.
    pub fn is_valid(&self, text_len: usize) -> bool {
        self.start <= self.end && self.end <= text_len
    }
}

/// One item extracted by an `extract` operator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionItem {
    /// The document containing the quoted span (always the message that
    /// carries the evidence, even for thread-unit extraction).
    pub message_id: DocId,
    /// Name of the extracted field.
    pub field: String,
    /// The extracted value.
    pub value: String,
    /// Character range of the evidence within `message_id`'s text.
    pub span: Span,
    /// Model confidence in this single item.
    pub confidence: f64,
    /// Surrounding context the model used to justify the extraction.
    pub context: String,
}

/// Where a thread-level label came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMeta {
    /// Always `"thread"` — present only on thread-unit labels.
    pub unit: ThreadUnit,
    /// The thread this label was computed over.
    pub thread_id: ThreadId,
    /// Message ids the model cited as evidence.
    pub cited_messages: Vec<DocId>,
}

/// Marker type so `ThreadMeta.unit` serializes to the literal `"thread"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadUnit {
    /// The only variant — a label either has thread_meta or it doesn't.
    Thread,
}

/// The polymorphic payload of a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    /// A simple string classification (e.g. a `tone` or `topic` tag).
    Simple(String),
    /// A compound boolean verdict with supporting details, used by
    /// free-form custom schemas (`matches: bool` plus arbitrary fields).
    Compound {
        /// The boolean verdict.
        matches: bool,
        /// Arbitrary supporting fields returned by the model.
        #[serde(flatten)]
        details: HashMap<String, serde_json::Value>,
    },
    /// A list of extraction items, produced by the `extract` operator.
    Extractions(Vec<ExtractionItem>),
}

impl LabelValue {
    /// View this value as a plain string, if it is one.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            LabelValue::Simple(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// View this value as a boolean verdict, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LabelValue::Compound { matches, .. } => Some(*matches),
            _ => None,
        }
    }

    /// View this value as extraction items, if it is a list of them.
    pub fn as_items(&self) -> Option<&[ExtractionItem]> {
        match self {
            LabelValue::Extractions(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

/// A classification or extraction result attached to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// The label's payload.
    pub value: LabelValue,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
    /// Free-text justification, if the model provided one.
    pub rationale: Option<String>,
    /// Evidence spans into the document's text, if any.
    pub spans: Option<Vec<Span>>,
    /// Present when this label was produced by a thread-unit operation.
    pub thread_meta: Option<ThreadMeta>,
}

impl Label {
    /// Construct a simple string label with no rationale, spans, or thread
    /// metadata.
    pub fn simple(value: impl Into<String>, confidence: f64) -> Self {
        Self {
            value: LabelValue::Simple(value.into()),
            confidence,
            rationale: None,
            spans: None,
            thread_meta: None,
        }
    }
}

/// A document's labels, keyed by schema name (`"tone"`, `"topic"`,
/// `"label"` for custom schemas, `"extract:<schema>"` for extractions).
pub type LabelMap = HashMap<String, Label>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn span_validity() {
        assert!(Span { start: 0, end: 5 }.is_valid(5));
        assert!(!Span { start: 0, end: 6 }.is_valid(5));
        assert!(!Span { start: 5, end: 2 }.is_valid(10));
    }

    #[test]
    fn label_value_accessors() {
        let simple = LabelValue::Simple("hostile".into());
        assert_eq!(simple.as_string(), Some("hostile"));
        assert_eq!(simple.as_bool(), None);

        let mut details = HashMap::new();
        details.insert("amount".to_string(), json!(200));
        let compound = LabelValue::Compound {
            matches: true,
            details,
        };
        assert_eq!(compound.as_bool(), Some(true));
        assert_eq!(compound.as_string(), None);

        let items = LabelValue::Extractions(vec![]);
        assert!(items.as_items().unwrap().is_empty());
    }

    #[test]
    fn compound_label_round_trips_through_json() {
        let mut details = HashMap::new();
        details.insert("amount".to_string(), json!(200));
        let label = Label {
            value: LabelValue::Compound {
                matches: true,
                details,
            },
            confidence: 0.9,
            rationale: Some("mentions $200".into()),
            spans: None,
            thread_meta: None,
        };
        let json = serde_json::to_value(&label).unwrap();
        assert_eq!(json["value"]["matches"], true);
        assert_eq!(json["value"]["amount"], 200);
        let back: Label = serde_json::from_value(json).unwrap();
        assert_eq!(back, label);
    }

    #[test]
    fn thread_meta_serializes_unit_as_thread() {
        let meta = ThreadMeta {
            unit: ThreadUnit::Thread,
            thread_id: ThreadId::from("t1"),
            cited_messages: vec![DocId::from("a")],
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["unit"], "thread");
    }
}
