//! The synthesizer: one structured LLM call turning an executed [`DocSet`]
//! into a cited Markdown answer. By contract it never raises — a provider
//! failure or an unparseable response degrades to a plain-text fallback
//! instead of propagating an error.

use qe_core::{Corpus, DocId, DocSet, StepTrace, ThreadId};
use qe_provider::{GenerateRequest, Provider, ReasoningEffort, TokenUsage};
use serde::Deserialize;

/// Caps how many documents are shown to the model, to bound prompt size and
/// latency. The returned [`DocSet`] itself is never clamped — only what the
/// synthesizer reads from it to build its prompt.
const MAX_CITED_DOCUMENTS: usize = 40;

/// A single citation backing a claim in the answer.
#[derive(Debug, Clone)]
pub struct Citation {
    /// The cited document.
    pub doc_id: DocId,
    /// The document's message number, if known.
    pub message_number: Option<u32>,
    /// A short excerpt of the cited text.
    pub preview: String,
    /// The thread the document belongs to, if any.
    pub thread_id: Option<ThreadId>,
}

/// The synthesizer's output. Always produced, even when the underlying call
/// failed.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// The answer text, in Markdown, with `[doc-id]` citations.
    pub answer: String,
    /// The citations referenced in `answer`.
    pub citations: Vec<Citation>,
    /// Whether the answer is organized by thread (true for thread-level
    /// classifications) rather than as a flat per-message list.
    pub thread_grouped: bool,
    /// Token usage for the call, if the provider reported it.
    pub usage: Option<TokenUsage>,
}

impl SynthesisResult {
    fn fallback(answer: impl Into<String>, usage: Option<TokenUsage>) -> Self {
        Self {
            answer: answer.into(),
            citations: Vec::new(),
            thread_grouped: false,
            usage,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCitation {
    doc_id: String,
    #[serde(default)]
    message_number: Option<u32>,
    #[serde(default)]
    preview: String,
}

#[derive(Debug, Deserialize)]
struct RawSynthesis {
    answer: String,
    #[serde(default)]
    citations: Vec<RawCitation>,
    #[serde(default)]
    thread_grouped: bool,
}

const INSTRUCTIONS: &str = r#"You write the final answer to a question about a corpus of conversational
messages, given the documents an execution plan has already selected.

Rules:
- Every factual claim is followed by a `[doc-id]` citation naming the
  message it came from.
- A label with low confidence is qualified ("appears to", "may"), never
  asserted as fact.
- If the documents carry thread-level classifications, group the answer by
  thread and cite only that thread's `cited_messages`, not every message in
  the thread.
- If the documents carry message-level classifications, present them as a
  flat list, one citation per message.
- Respond with JSON: {"answer": string, "citations": [{"doc_id", "message_number", "preview"}], "thread_grouped": bool}."#;

fn synthesis_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "answer": { "type": "string" },
            "citations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "doc_id": { "type": "string" },
                        "message_number": { "type": "integer" },
                        "preview": { "type": "string" },
                    },
                    "required": ["doc_id"],
                },
            },
            "thread_grouped": { "type": "boolean" },
        },
        "required": ["answer", "citations", "thread_grouped"],
    })
}

fn render_documents(docset: &DocSet, corpus: &Corpus) -> String {
    let mut rendered = String::new();
    for doc in docset.documents().iter().take(MAX_CITED_DOCUMENTS) {
        let labels = docset.labels_for(&doc.id);
        // Looked up by id rather than read off `doc` directly: this is the
        // canonical record, so the model is told the true message number
        // and thread instead of whatever it infers from the text alone.
        let canonical = corpus.get(&doc.id);
        let message_number = canonical.and_then(|d| d.metadata.message_number);
        let thread_id = canonical.and_then(|d| d.metadata.thread_id.clone());
        rendered.push_str(&format!(
            "[{}] msg={} thread={} {} — {}\n{}\n",
            doc.id,
            message_number.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string()),
            thread_id.map(|t| t.to_string()).unwrap_or_else(|| "none".to_string()),
            doc.metadata.sender,
            doc.timestamp,
            doc.text
        ));
        if let Some(labels) = labels {
            for (schema, label) in labels {
                rendered.push_str(&format!(
                    "  label {schema}: confidence={:.2}\n",
                    label.confidence
                ));
            }
        }
        rendered.push('\n');
    }
    if docset.len() > MAX_CITED_DOCUMENTS {
        rendered.push_str(&format!(
            "... and {} more documents not shown\n",
            docset.len() - MAX_CITED_DOCUMENTS
        ));
    }
    rendered
}

/// Resolves a model-reported citation against the corpus: `message_number`
/// and `thread_id` come from the document record itself, never from the
/// model's own JSON, since the model can misremember either.
fn hydrate_citation(raw: RawCitation, corpus: &Corpus) -> Citation {
    let doc_id = DocId::from(raw.doc_id);
    let document = corpus.get(&doc_id);
    Citation {
        message_number: document.and_then(|d| d.metadata.message_number).or(raw.message_number),
        thread_id: document.and_then(|d| d.metadata.thread_id.clone()),
        preview: raw.preview,
        doc_id,
    }
}

/// Turns an executed [`DocSet`] into a cited answer.
pub struct Synthesizer<P: Provider> {
    provider: P,
    model: String,
}

impl<P: Provider> Synthesizer<P> {
    /// Build a synthesizer backed by `provider`, using `model` for its one
    /// call.
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Synthesize an answer to `query` from the documents and trace an
    /// executed plan produced. Never returns an error: provider failures and
    /// unparseable responses degrade to [`SynthesisResult::fallback`].
    pub async fn synthesize(
        &self,
        query: &str,
        docset: &DocSet,
        trace: &[StepTrace],
        corpus: &Corpus,
    ) -> SynthesisResult {
        let steps_summary: Vec<_> = trace
            .iter()
            .map(|t| serde_json::json!({"op": t.step.op, "status": format!("{:?}", t.status), "output_count": t.output_count}))
            .collect();

        let input = serde_json::json!({
            "query": query,
            "documents": render_documents(docset, corpus),
            "steps": steps_summary,
        })
        .to_string();

        let request = GenerateRequest {
            model: self.model.clone(),
            instructions: INSTRUCTIONS.to_string(),
            input,
            reasoning_effort: ReasoningEffort::Medium,
            json_schema: synthesis_schema(),
        };

        tracing::debug!(model = %self.model, documents = docset.len(), "requesting synthesis");
        let response = match self.provider.generate_structured(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "synthesis call failed, falling back to plain text");
                return SynthesisResult::fallback(format!("Unable to generate an answer: {err}"), None);
            }
        };

        match serde_json::from_str::<RawSynthesis>(&response.output_text) {
            Ok(raw) => SynthesisResult {
                citations: raw.citations.into_iter().map(|c| hydrate_citation(c, corpus)).collect(),
                answer: raw.answer,
                thread_grouped: raw.thread_grouped,
                usage: response.usage,
            },
            Err(e) => {
                tracing::warn!(error = %e, "synthesis response did not parse, falling back to raw text");
                SynthesisResult::fallback(response.output_text, response.usage)
            }
        }
    }
}
