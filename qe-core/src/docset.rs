//! The DocSet algebra — the pipeline's value type.
//!
//! A [`DocSet`] bundles an ordered document list, a label map keyed by
//! document id, and an append-only audit trail. Every method here returns a
//! fresh `DocSet`; documents are shared by `Arc` so cloning the list is
//! cheap, while labels and audit are the only parts actually copied per
//! step, per the "Immutable DocSets over aliasing" design note.

use crate::audit::AuditEntry;
use crate::document::{Corpus, Document};
use crate::id::DocId;
use crate::label::LabelMap;
use std::collections::HashMap;
use std::sync::Arc;

/// An immutable bundle of (documents, labels, audit) passed between
/// operators. Every transform returns a new `DocSet`; nothing here is ever
/// mutated in place.
#[derive(Debug, Clone, Default)]
pub struct DocSet {
    docs: Vec<Arc<Document>>,
    labels: HashMap<DocId, LabelMap>,
    audit: Vec<AuditEntry>,
}

impl DocSet {
    /// A DocSet containing every corpus document, no labels, empty audit.
    pub fn from_corpus(corpus: &Corpus) -> Self {
        Self {
            docs: corpus.documents().iter().cloned().map(Arc::new).collect(),
            labels: HashMap::new(),
            audit: Vec::new(),
        }
    }

    /// Documents in this set's current order.
    pub fn documents(&self) -> &[Arc<Document>] {
        &self.docs
    }

    /// Number of documents currently in the set.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the set has no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// The label map for every document that has one.
    pub fn labels(&self) -> &HashMap<DocId, LabelMap> {
        &self.labels
    }

    /// Labels attached to a single document, if any.
    pub fn labels_for(&self, id: &DocId) -> Option<&LabelMap> {
        self.labels.get(id)
    }

    /// The audit trail accumulated so far.
    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }

    /// Union of the given sets, by document id, first occurrence wins.
    /// Labels merge last-writer-wins across the inputs in order. Audit
    /// trails concatenate in input order.
    pub fn union(sets: &[&DocSet]) -> DocSet {
        let mut seen = std::collections::HashSet::new();
        let mut docs = Vec::new();
        let mut labels: HashMap<DocId, LabelMap> = HashMap::new();
        let mut audit = Vec::new();

        for set in sets {
            for doc in &set.docs {
                if seen.insert(doc.id.clone()) {
                    docs.push(Arc::clone(doc));
                }
            }
        }
        for set in sets {
            for (id, label_map) in &set.labels {
                labels.insert(id.clone(), label_map.clone());
            }
            audit.extend(set.audit.iter().cloned());
        }

        DocSet {
            docs,
            labels,
            audit,
        }
    }

    /// Intersection of the given sets, keeping only documents present in
    /// every input, ordered as they appear in the first input. Labels
    /// merge last-writer-wins across inputs, restricted to the kept ids.
    pub fn intersect(sets: &[&DocSet]) -> DocSet {
        if sets.is_empty() {
            return DocSet::default();
        }

        let mut id_counts: HashMap<DocId, usize> = HashMap::new();
        for set in sets {
            let mut seen_in_set = std::collections::HashSet::new();
            for doc in &set.docs {
                if seen_in_set.insert(doc.id.clone()) {
                    *id_counts.entry(doc.id.clone()).or_insert(0) += 1;
                }
            }
        }
        let kept: std::collections::HashSet<DocId> = id_counts
            .into_iter()
            .filter(|(_, count)| *count == sets.len())
            .map(|(id, _)| id)
            .collect();

        let mut docs = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for doc in &sets[0].docs {
            if kept.contains(&doc.id) && seen.insert(doc.id.clone()) {
                docs.push(Arc::clone(doc));
            }
        }

        let mut labels: HashMap<DocId, LabelMap> = HashMap::new();
        let mut audit = Vec::new();
        for set in sets {
            for (id, label_map) in &set.labels {
                if kept.contains(id) {
                    labels.insert(id.clone(), label_map.clone());
                }
            }
            audit.extend(set.audit.iter().cloned());
        }

        DocSet {
            docs,
            labels,
            audit,
        }
    }

    /// Keep only documents matching `predicate`; drop labels for dropped
    /// documents; preserve the audit trail.
    pub fn filter(&self, mut predicate: impl FnMut(&Document) -> bool) -> DocSet {
        let docs: Vec<Arc<Document>> = self
            .docs
            .iter()
            .filter(|d| predicate(d))
            .cloned()
            .collect();
        let kept: std::collections::HashSet<&DocId> = docs.iter().map(|d| &d.id).collect();
        let labels = self
            .labels
            .iter()
            .filter(|(id, _)| kept.contains(id))
            .map(|(id, l)| (id.clone(), l.clone()))
            .collect();
        DocSet {
            docs,
            labels,
            audit: self.audit.clone(),
        }
    }

    /// Reorder the document list without dropping anything, e.g. for
    /// `top_k`/`sample`. Labels for documents no longer present are
    /// dropped; documents retained keep their labels.
    pub fn with_documents(&self, docs: Vec<Arc<Document>>) -> DocSet {
        let kept: std::collections::HashSet<&DocId> = docs.iter().map(|d| &d.id).collect();
        let labels = self
            .labels
            .iter()
            .filter(|(id, _)| kept.contains(id))
            .map(|(id, l)| (id.clone(), l.clone()))
            .collect();
        DocSet {
            docs,
            labels,
            audit: self.audit.clone(),
        }
    }

    /// Replace the label map wholesale (a shallow snapshot); documents and
    /// audit are unchanged.
    pub fn with_labels(&self, next_labels: HashMap<DocId, LabelMap>) -> DocSet {
        DocSet {
            docs: self.docs.clone(),
            labels: next_labels,
            audit: self.audit.clone(),
        }
    }

    /// Merge new/updated per-document labels into the existing map (used by
    /// Tier-3 operators, which only ever add or replace specific schema
    /// keys for specific documents rather than replacing the whole map).
    pub fn merge_labels(&self, updates: HashMap<DocId, LabelMap>) -> DocSet {
        let mut labels = self.labels.clone();
        for (id, update) in updates {
            labels.entry(id).or_default().extend(update);
        }
        DocSet {
            docs: self.docs.clone(),
            labels,
            audit: self.audit.clone(),
        }
    }

    /// Append one audit entry; documents and labels are unchanged.
    pub fn with_audit(&self, entry: AuditEntry) -> DocSet {
        let mut audit = self.audit.clone();
        audit.push(entry);
        DocSet {
            docs: self.docs.clone(),
            labels: self.labels.clone(),
            audit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMetadata;
    use chrono::{DateTime, Utc};

    fn doc(id: &str, sender: &str) -> Document {
        Document {
            id: DocId::from(id),
            source: "vendor-report".into(),
            timestamp: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            text: format!("text from {sender}"),
            metadata: DocumentMetadata {
                sender: sender.into(),
                recipient: "other".into(),
                thread_id: None,
                subject: None,
                word_count: 3,
                message_number: None,
            },
        }
    }

    fn set_of(ids: &[&str]) -> DocSet {
        let corpus = Corpus::new(ids.iter().map(|id| doc(id, "Sarah")).collect());
        DocSet::from_corpus(&corpus)
    }

    #[test]
    fn from_corpus_has_no_labels_and_empty_audit() {
        let set = set_of(&["a", "b"]);
        assert_eq!(set.len(), 2);
        assert!(set.labels().is_empty());
        assert!(set.audit().is_empty());
    }

    #[test]
    fn union_dedupes_keeping_first_seen() {
        let a = set_of(&["a", "b"]);
        let b = set_of(&["b", "c"]);
        let u = DocSet::union(&[&a, &b]);
        let ids: Vec<&str> = u.documents().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn union_of_set_with_itself_is_identity_in_membership() {
        let a = set_of(&["a", "b"]);
        let u = DocSet::union(&[&a, &a]);
        let mut ids: Vec<&str> = u.documents().iter().map(|d| d.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn intersect_keeps_only_common_ids() {
        let a = set_of(&["a", "b", "c"]);
        let b = set_of(&["b", "c", "d"]);
        let i = DocSet::intersect(&[&a, &b]);
        let ids: Vec<&str> = i.documents().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn intersect_of_set_with_itself_is_identity() {
        let a = set_of(&["a", "b"]);
        let i = DocSet::intersect(&[&a, &a]);
        assert_eq!(i.len(), 2);
    }

    #[test]
    fn filter_drops_labels_for_dropped_documents() {
        let set = set_of(&["a", "b"]);
        let labels: HashMap<DocId, LabelMap> = [
            (DocId::from("a"), LabelMap::new()),
            (DocId::from("b"), LabelMap::new()),
        ]
        .into_iter()
        .collect();
        let labeled = set.with_labels(labels);
        let filtered = labeled.filter(|d| d.id.as_str() == "a");
        assert_eq!(filtered.len(), 1);
        assert!(filtered.labels_for(&DocId::from("a")).is_some());
        assert!(filtered.labels_for(&DocId::from("b")).is_none());
    }

    #[test]
    fn with_audit_is_append_only() {
        let set = set_of(&["a"]);
        let e1 = AuditEntry::passthrough("op1", 1, Utc::now());
        let e2 = AuditEntry::passthrough("op2", 1, Utc::now());
        let s1 = set.with_audit(e1.clone());
        let s2 = s1.with_audit(e2.clone());
        assert_eq!(s2.audit(), &[e1, e2]);
        // original set is untouched
        assert!(set.audit().is_empty());
    }

    #[test]
    fn merge_labels_extends_existing_schema_keys() {
        let set = set_of(&["a"]);
        let mut first = LabelMap::new();
        first.insert("tone".to_string(), crate::label::Label::simple("hostile", 0.9));
        let set = set.merge_labels([(DocId::from("a"), first)].into_iter().collect());

        let mut second = LabelMap::new();
        second.insert("topic".to_string(), crate::label::Label::simple("money", 0.8));
        let set = set.merge_labels([(DocId::from("a"), second)].into_iter().collect());

        let labels = set.labels_for(&DocId::from("a")).unwrap();
        assert!(labels.contains_key("tone"));
        assert!(labels.contains_key("topic"));
    }
}
