//! Recover a JSON payload from free-text LLM output.
//!
//! The fallback extraction path cannot assume a clean JSON reply: models
//! prepend commentary, wrap the payload in fenced code blocks, or return a
//! JSON-encoded *string* whose content is the real array. This module is the
//! single place that deals with all of that, in order:
//!
//! 1. strip a fenced code block if present (```json ... ```),
//! 2. try a direct parse (unwrapping one level of string-encoded JSON),
//! 3. locate the outermost `[`..`]` span — scanning with a string-literal
//!    and escape-aware depth counter, so brackets inside strings don't break
//!    the span — and parse that slice; `{`..`}` is tried last for
//!    object-shaped replies.

use serde_json::Value;

/// Extracts the best-effort JSON payload from `raw`. `None` when nothing in
/// the text parses as JSON.
pub fn extract_json_payload(raw: &str) -> Option<Value> {
    let text = strip_code_fence(raw);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return Some(unwrap_string_payload(v));
    }

    for (open, close) in [('[', ']'), ('{', '}')] {
        if let Some(span) = bracket_span(text, open, close) {
            if let Ok(v) = serde_json::from_str::<Value>(span) {
                return Some(unwrap_string_payload(v));
            }
        }
    }
    None
}

/// If the whole payload is a JSON string containing JSON, parse one level
/// deeper ("\"[{...}]\"" → the array).
fn unwrap_string_payload(v: Value) -> Value {
    if let Value::String(inner) = &v {
        if let Ok(nested) = serde_json::from_str::<Value>(inner.trim()) {
            if nested.is_array() || nested.is_object() {
                return nested;
            }
        }
    }
    v
}

/// Returns the inner content of the first fenced code block, or the input
/// unchanged when no fence is present. An optional language tag after the
/// opening fence is dropped.
fn strip_code_fence(raw: &str) -> &str {
    let Some(open) = raw.find("```") else {
        return raw;
    };
    let after_open = &raw[open + 3..];
    // Skip the language tag line ("json", "javascript", ...).
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

/// Finds the outermost `open`..`close` span, honoring JSON string literals
/// and backslash escapes so a `]` inside `"a]b"` does not close the span.
fn bracket_span(text: &str, open: char, close: char) -> Option<&str> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' if start.is_some() => in_string = true,
            c if c == open => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            c if c == close => {
                if let Some(s) = start {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[s..i + c.len_utf8()]);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_array_parses_directly() {
        let v = extract_json_payload(r#"[{"title":"t"}]"#).unwrap();
        assert_eq!(v, json!([{"title": "t"}]));
    }

    #[test]
    fn fenced_block_is_stripped() {
        let raw = "Here you go:\n```json\n[{\"title\":\"t\"}]\n```\nanything else";
        let v = extract_json_payload(raw).unwrap();
        assert_eq!(v, json!([{"title": "t"}]));
    }

    #[test]
    fn commentary_before_array_is_skipped() {
        let raw = "Sure! Based on the file, the rules are: [{\"title\":\"t\"}] hope that helps";
        let v = extract_json_payload(raw).unwrap();
        assert_eq!(v, json!([{"title": "t"}]));
    }

    #[test]
    fn brackets_inside_string_literals_do_not_close_the_span() {
        let raw = r#"noise [{"title":"uses ] and [ in text","rule":"r"}] trailing"#;
        let v = extract_json_payload(raw).unwrap();
        assert_eq!(v[0]["title"], "uses ] and [ in text");
    }

    #[test]
    fn escaped_quotes_inside_strings_are_handled() {
        let raw = r#"x [{"title":"say \"hi\" [ok]"}] y"#;
        let v = extract_json_payload(raw).unwrap();
        assert_eq!(v[0]["title"], r#"say "hi" [ok]"#);
    }

    #[test]
    fn json_encoded_string_payload_is_unwrapped() {
        let raw = r#""[{\"title\":\"t\"}]""#;
        let v = extract_json_payload(raw).unwrap();
        assert_eq!(v, json!([{"title": "t"}]));
    }

    #[test]
    fn object_shape_is_found_when_no_array_exists() {
        let raw = "result: {\"rules\": []} done";
        let v = extract_json_payload(raw).unwrap();
        assert_eq!(v, json!({"rules": []}));
    }

    #[test]
    fn garbage_yields_none() {
        assert!(extract_json_payload("no json here at all").is_none());
        assert!(extract_json_payload("").is_none());
        assert!(extract_json_payload("[unclosed").is_none());
    }
}
