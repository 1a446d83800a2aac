// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal `{{dot.path}}` template substitution against a JSON payload.
//!
//! Rendering is total: unknown placeholders and non-scalar lookups become
//! the empty string, so a malformed template degrades the message body but
//! never blocks delivery.

use serde_json::Value;

/// Look up a dotted path in a JSON value. Array indices are not supported;
/// only object traversal.
fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = payload;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Substitute every `{{path}}` placeholder in `template` with the scalar at
/// that payload path. Unmatched braces pass through verbatim.
pub fn render(template: &str, payload: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        match after_open.find("}}") {
            Some(close) => {
                let path = after_open[..close].trim();
                if let Some(value) = lookup(payload, path) {
                    out.push_str(&render_value(value));
                }
                rest = &after_open[close + 2..];
            }
            None => {
                // Unterminated placeholder; emit the rest as-is.
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_nested_paths() {
        let payload = json!({
            "order": { "id": 42, "customer": { "name": "Kim" } },
            "paid": true
        });
        assert_eq!(
            render("Hi {{order.customer.name}}, order {{order.id}} paid={{paid}}", &payload),
            "Hi Kim, order 42 paid=true"
        );
    }

    #[test]
    fn missing_paths_render_empty() {
        let payload = json!({ "a": 1 });
        assert_eq!(render("x{{b.c}}y", &payload), "xy");
        assert_eq!(render("x{{a.deeper}}y", &payload), "xy");
    }

    #[test]
    fn non_scalars_render_empty() {
        let payload = json!({ "list": [1, 2], "obj": { "k": 1 }, "nil": null });
        assert_eq!(render("{{list}}{{obj}}{{nil}}", &payload), "");
    }

    #[test]
    fn plain_text_and_stray_braces_pass_through() {
        let payload = json!({});
        assert_eq!(render("no placeholders", &payload), "no placeholders");
        assert_eq!(render("open {{unclosed", &payload), "open {{unclosed");
        assert_eq!(render("single } brace {", &payload), "single } brace {");
    }
}
