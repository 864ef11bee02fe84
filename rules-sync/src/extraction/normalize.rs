//! Normalization of raw LLM output into well-formed rule candidates.
//!
//! The model's output is treated as hostile input: casing, missing fields and
//! malformed example entries are all repaired here so that every candidate
//! leaving this module has a valid severity, scope, path and example list.

use serde_json::Value;
use tracing::debug;

use crate::types::{RuleCandidate, RuleExample, RuleScope, Severity};

/// Normalizes a parsed JSON payload into candidates.
///
/// Accepted shapes: an array of rule objects, a single rule object, or an
/// object wrapping the array under a `rules` key. Entries without both a
/// `title` and a `rule` text are dropped.
pub fn normalize_candidates(payload: &Value, default_path: &str) -> Vec<RuleCandidate> {
    let items: Vec<&Value> = match payload {
        Value::Array(arr) => arr.iter().collect(),
        Value::Object(obj) => match obj.get("rules") {
            Some(Value::Array(arr)) => arr.iter().collect(),
            _ => vec![payload],
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| normalize_one(item, default_path))
        .collect()
}

fn normalize_one(item: &Value, default_path: &str) -> Option<RuleCandidate> {
    let obj = item.as_object()?;

    let title = obj.get("title").and_then(Value::as_str)?.trim();
    let rule = obj
        .get("rule")
        .or_else(|| obj.get("description"))
        .and_then(Value::as_str)?
        .trim();
    if title.is_empty() || rule.is_empty() {
        debug!("dropping candidate with empty title or rule text");
        return None;
    }

    let severity = obj
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::parse_lenient)
        .unwrap_or_default();
    let scope = obj
        .get("scope")
        .and_then(Value::as_str)
        .and_then(RuleScope::parse_lenient)
        .unwrap_or_default();

    let path = obj
        .get("path")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_path)
        .to_string();
    let source_path = obj
        .get("sourcePath")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_path)
        .to_string();

    let examples = obj
        .get("examples")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(normalize_example).collect())
        .unwrap_or_default();

    let source_snippet = obj
        .get("sourceSnippet")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(RuleCandidate {
        title: title.to_string(),
        rule: rule.to_string(),
        path,
        source_path,
        severity,
        scope,
        examples,
        source_snippet,
    })
}

/// Coerces one example entry. A bare string becomes an incorrect-snippet
/// example; anything unrecognizable degrades to an empty snippet rather than
/// being dropped, preserving example counts for the caller.
fn normalize_example(item: &Value) -> RuleExample {
    match item {
        Value::String(s) => RuleExample {
            snippet: s.clone(),
            is_correct: false,
        },
        Value::Object(obj) => RuleExample {
            snippet: obj
                .get("snippet")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            is_correct: obj
                .get("isCorrect")
                .or_else(|| obj.get("is_correct"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        _ => RuleExample {
            snippet: String::new(),
            is_correct: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_applied_for_missing_fields() {
        let payload = json!([{"title": "T", "rule": "R"}]);
        let out = normalize_candidates(&payload, ".cursor/rules/a.md");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].severity, Severity::Medium);
        assert_eq!(out[0].scope, RuleScope::File);
        assert_eq!(out[0].path, ".cursor/rules/a.md");
        assert_eq!(out[0].source_path, ".cursor/rules/a.md");
        assert!(out[0].examples.is_empty());
    }

    #[test]
    fn miscapitalized_severity_and_scope_are_repaired() {
        let payload = json!([{
            "title": "T", "rule": "R",
            "severity": "CRITICAL", "scope": "Pull-Request"
        }]);
        let out = normalize_candidates(&payload, "f.md");
        assert_eq!(out[0].severity, Severity::Critical);
        assert_eq!(out[0].scope, RuleScope::PullRequest);
    }

    #[test]
    fn unknown_severity_falls_back_to_medium() {
        let payload = json!([{"title": "T", "rule": "R", "severity": "urgent"}]);
        let out = normalize_candidates(&payload, "f.md");
        assert_eq!(out[0].severity, Severity::Medium);
    }

    #[test]
    fn malformed_examples_are_coerced() {
        let payload = json!([{
            "title": "T", "rule": "R",
            "examples": [
                {"snippet": "good()", "isCorrect": true},
                "bare string",
                42,
                {"isCorrect": "not-a-bool"}
            ]
        }]);
        let out = normalize_candidates(&payload, "f.md");
        let ex = &out[0].examples;
        assert_eq!(ex.len(), 4);
        assert_eq!(ex[0], RuleExample { snippet: "good()".into(), is_correct: true });
        assert_eq!(ex[1], RuleExample { snippet: "bare string".into(), is_correct: false });
        assert_eq!(ex[2], RuleExample { snippet: "".into(), is_correct: false });
        assert_eq!(ex[3], RuleExample { snippet: "".into(), is_correct: false });
    }

    #[test]
    fn single_object_and_rules_wrapper_shapes() {
        let single = json!({"title": "T", "rule": "R"});
        assert_eq!(normalize_candidates(&single, "f").len(), 1);

        let wrapped = json!({"rules": [{"title": "A", "rule": "B"}]});
        assert_eq!(normalize_candidates(&wrapped, "f").len(), 1);
    }

    #[test]
    fn entries_without_title_or_rule_are_dropped() {
        let payload = json!([
            {"rule": "no title"},
            {"title": "no rule text"},
            {"title": "  ", "rule": "blank title"},
            {"title": "ok", "rule": "ok"}
        ]);
        assert_eq!(normalize_candidates(&payload, "f").len(), 1);
    }
}
