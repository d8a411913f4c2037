//! The `filter_by_label` condition grammar.
//!
//! `clause (WS AND WS clause)*`, `clause = field WS? cmp WS? value | field`,
//! `cmp ∈ {==, !=, >=, <=, >, <}`. A bare field is sugar for
//! `field == true`. The grammar is `AND`-only: `OR` is not implemented
//! here, and callers that generate conditions (the planner) must not claim
//! `OR` support.

use qe_core::LabelMap;
use std::collections::HashMap;

use crate::error::OperatorError;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

/// A parsed comparison value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// `true` / `false` (case-insensitive).
    Bool(bool),
    /// A numeric literal.
    Number(f64),
    /// Anything else, quoted or bare.
    Text(String),
}

/// One `field cmp value` clause.
#[derive(Debug, Clone)]
pub struct Clause {
    field: String,
    cmp: Cmp,
    value: ConditionValue,
}

/// A conjunction of clauses, all of which must hold for a document to
/// pass `filter_by_label`.
#[derive(Debug, Clone)]
pub struct Condition {
    clauses: Vec<Clause>,
}

impl Condition {
    /// Parse a condition string.
    pub fn parse(input: &str) -> Result<Self, OperatorError> {
        let clauses = split_and(input)
            .into_iter()
            .map(parse_clause)
            .collect::<Result<Vec<_>, _>>()?;
        if clauses.is_empty() {
            return Err(OperatorError::InvalidArgs {
                op: "filter_by_label".into(),
                message: "condition must have at least one clause".into(),
            });
        }
        Ok(Self { clauses })
    }

    /// Whether `labels` satisfies every clause.
    pub fn matches(&self, labels: &LabelMap) -> bool {
        self.clauses.iter().all(|clause| clause.matches(labels))
    }
}

/// Splits on case-insensitive `AND` outside of quoted strings.
fn split_and(input: &str) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => in_quotes = !in_quotes,
            _ if !in_quotes && matches_and_at(input, i) => {
                parts.push(input[start..i].trim());
                i += 3;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(input[start..].trim());
    parts.into_iter().filter(|s| !s.is_empty()).collect()
}

fn matches_and_at(input: &str, i: usize) -> bool {
    let bytes = input.as_bytes();
    if i + 3 > bytes.len() {
        return false;
    }
    let word = &input[i..i + 3];
    if !word.eq_ignore_ascii_case("and") {
        return false;
    }
    let before_ok = i == 0 || bytes[i - 1].is_ascii_whitespace();
    let after_ok = i + 3 == bytes.len() || bytes[i + 3].is_ascii_whitespace();
    before_ok && after_ok
}

fn parse_clause(raw: &str) -> Result<Clause, OperatorError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(OperatorError::InvalidArgs {
            op: "filter_by_label".into(),
            message: "empty clause".into(),
        });
    }

    const OPERATORS: &[(&str, Cmp)] = &[
        ("==", Cmp::Eq),
        ("!=", Cmp::Ne),
        (">=", Cmp::Ge),
        ("<=", Cmp::Le),
        (">", Cmp::Gt),
        ("<", Cmp::Lt),
    ];

    for (token, cmp) in OPERATORS {
        if let Some(pos) = raw.find(token) {
            let field = raw[..pos].trim().to_string();
            let value_raw = raw[pos + token.len()..].trim();
            if field.is_empty() || value_raw.is_empty() {
                return Err(OperatorError::InvalidArgs {
                    op: "filter_by_label".into(),
                    message: format!("malformed clause: {raw}"),
                });
            }
            return Ok(Clause {
                field,
                cmp: *cmp,
                value: parse_value(value_raw),
            });
        }
    }

    // Bare field: sugar for `field == true`.
    Ok(Clause {
        field: raw.to_string(),
        cmp: Cmp::Eq,
        value: ConditionValue::Bool(true),
    })
}

fn parse_value(raw: &str) -> ConditionValue {
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));

    if let Some(text) = unquoted {
        return ConditionValue::Text(text.to_string());
    }
    if raw.eq_ignore_ascii_case("true") {
        return ConditionValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return ConditionValue::Bool(false);
    }
    if let Ok(n) = raw.parse::<f64>() {
        return ConditionValue::Number(n);
    }
    ConditionValue::Text(raw.to_string())
}

/// What a label field resolves to, before comparison.
enum Resolved {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Clause {
    fn matches(&self, labels: &LabelMap) -> bool {
        let Some(resolved) = resolve_field(&self.field, labels) else {
            return false;
        };
        compare(&resolved, self.cmp, &self.value)
    }
}

/// Picks a deterministic "first" label entry when the rule set refers to
/// `label`/`value`/`confidence` generically. `LabelMap` is a `HashMap` with
/// no iteration-order guarantee, so "first" is defined as the
/// lexicographically smallest key — stable across runs, documented here
/// rather than relying on incidental insertion order.
fn first_entry(labels: &LabelMap) -> Option<(&String, &qe_core::Label)> {
    labels.iter().min_by(|(a, _), (b, _)| a.cmp(b))
}

fn resolve_field(field: &str, labels: &HashMap<String, qe_core::Label>) -> Option<Resolved> {
    if let Some(label) = labels.get(field) {
        return Some(label_to_resolved(label));
    }
    match field.to_ascii_lowercase().as_str() {
        "label" | "value" => first_entry(labels).map(|(_, l)| label_to_resolved(l)),
        "confidence" => first_entry(labels).map(|(_, l)| Resolved::Number(l.confidence)),
        "matches" => first_entry(labels).and_then(|(_, l)| match &l.value {
            qe_core::LabelValue::Compound { matches, .. } => Some(Resolved::Bool(*matches)),
            _ => None,
        }),
        _ => None,
    }
}

fn label_to_resolved(label: &qe_core::Label) -> Resolved {
    match &label.value {
        qe_core::LabelValue::Simple(s) => Resolved::Text(s.clone()),
        qe_core::LabelValue::Compound { matches, .. } => Resolved::Bool(*matches),
        qe_core::LabelValue::Extractions(items) => Resolved::Number(items.len() as f64),
    }
}

fn compare(resolved: &Resolved, cmp: Cmp, expected: &ConditionValue) -> bool {
    // `==`/`!=` coerce to boolean if expected is true/false, to number if
    // both numeric, else case-insensitive string equality. Ordering
    // comparators require both sides numeric.
    match cmp {
        Cmp::Eq | Cmp::Ne => {
            let equal = match expected {
                ConditionValue::Bool(expected_bool) => match resolved {
                    Resolved::Bool(b) => b == expected_bool,
                    Resolved::Text(s) => s.eq_ignore_ascii_case(&expected_bool.to_string()),
                    Resolved::Number(n) => (*n != 0.0) == *expected_bool,
                },
                ConditionValue::Number(expected_num) => match resolved {
                    Resolved::Number(n) => n == expected_num,
                    Resolved::Text(s) => s.parse::<f64>().map(|n| n == *expected_num).unwrap_or(false),
                    Resolved::Bool(_) => false,
                },
                ConditionValue::Text(expected_text) => match resolved {
                    Resolved::Text(s) => s.eq_ignore_ascii_case(expected_text),
                    Resolved::Bool(b) => expected_text.eq_ignore_ascii_case(&b.to_string()),
                    Resolved::Number(n) => expected_text
                        .parse::<f64>()
                        .map(|v| v == *n)
                        .unwrap_or(false),
                },
            };
            if matches!(cmp, Cmp::Eq) {
                equal
            } else {
                !equal
            }
        }
        Cmp::Gt | Cmp::Lt | Cmp::Ge | Cmp::Le => {
            let (Resolved::Number(lhs), ConditionValue::Number(rhs)) = (resolved, expected) else {
                return false;
            };
            match cmp {
                Cmp::Gt => lhs > rhs,
                Cmp::Lt => lhs < rhs,
                Cmp::Ge => lhs >= rhs,
                Cmp::Le => lhs <= rhs,
                Cmp::Eq | Cmp::Ne => unreachable!(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qe_core::Label;

    fn labels_with(key: &str, label: Label) -> LabelMap {
        let mut map = LabelMap::new();
        map.insert(key.to_string(), label);
        map
    }

    #[test]
    fn bare_field_is_sugar_for_equals_true() {
        let cond = Condition::parse("matches").unwrap();
        let labels = labels_with(
            "label",
            Label {
                value: qe_core::LabelValue::Compound {
                    matches: true,
                    details: Default::default(),
                },
                confidence: 0.9,
                rationale: None,
                spans: None,
                thread_meta: None,
            },
        );
        assert!(cond.matches(&labels));
    }

    #[test]
    fn compound_and_confidence_conjunction() {
        let cond = Condition::parse("matches == true AND confidence > 0.6").unwrap();
        let ok = labels_with(
            "label",
            Label {
                value: qe_core::LabelValue::Compound {
                    matches: true,
                    details: Default::default(),
                },
                confidence: 0.8,
                rationale: None,
                spans: None,
                thread_meta: None,
            },
        );
        assert!(cond.matches(&ok));

        let low_confidence = labels_with(
            "label",
            Label {
                value: qe_core::LabelValue::Compound {
                    matches: true,
                    details: Default::default(),
                },
                confidence: 0.5,
                rationale: None,
                spans: None,
                thread_meta: None,
            },
        );
        assert!(!cond.matches(&low_confidence));
    }

    #[test]
    fn missing_label_excludes_document() {
        let cond = Condition::parse("tone == hostile").unwrap();
        assert!(!cond.matches(&LabelMap::new()));
    }

    #[test]
    fn string_equality_is_case_insensitive() {
        let cond = Condition::parse("tone == Hostile").unwrap();
        let labels = labels_with("tone", Label::simple("hostile", 0.9));
        assert!(cond.matches(&labels));
    }

    #[test]
    fn quoted_value_preserves_spaces() {
        let cond = Condition::parse("topic == \"child custody\"").unwrap();
        let labels = labels_with("topic", Label::simple("child custody", 0.7));
        assert!(cond.matches(&labels));
    }

    #[test]
    fn rejects_empty_condition() {
        assert!(Condition::parse("").is_err());
    }
}
