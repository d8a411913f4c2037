//! Typed ID wrappers for documents, threads, and plan steps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up a document id with a thread id or a
/// step key at a call site. These are plain strings underneath — no format
/// is enforced, since ids are produced by the (out-of-scope) parser.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed id from anything that converts to `String`.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(DocId, "Unique identifier for a document.");
typed_id!(ThreadId, "Identifier for a thread (a group of documents sharing a conversation).");
typed_id!(StepKey, "Stable key for a plan step's output, used for cross-step references.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_display_and_conversion() {
        let id = DocId::from("doc-026");
        assert_eq!(id.as_str(), "doc-026");
        assert_eq!(id.to_string(), "doc-026");
        assert_eq!(DocId::new("doc-026".to_string()), id);
    }

    #[test]
    fn ids_are_hashable_and_distinct_types_compile() {
        let mut set = std::collections::HashSet::new();
        set.insert(DocId::from("a"));
        set.insert(DocId::from("b"));
        assert_eq!(set.len(), 2);
    }
}
