//! Turns an untrusted JSON payload into the HTML message sent to every chat.

use super::escape::escape_html;
use serde_json::{Number, Value};

/// Placeholder used when the request carried no usable payload.
pub const EMPTY_BODY: &str = "(empty body)";

/// Render each top-level field of `body` as `  - key: value`, escaped.
///
/// Objects are keyed by field name, arrays by element index. Anything else
/// (missing, malformed, `null`, scalars) renders as [`EMPTY_BODY`], as does a
/// body with no fields or elements.
pub fn format_body(body: Option<&Value>) -> String {
    let lines: Vec<String> = match body {
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(key, value)| format_line(key, value))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, value)| format_line(&index.to_string(), value))
            .collect(),
        _ => return EMPTY_BODY.to_string(),
    };

    let formatted = lines.join("\n");
    let formatted = formatted.trim();
    if formatted.is_empty() {
        EMPTY_BODY.to_string()
    } else {
        formatted.to_string()
    }
}

fn format_line(key: &str, value: &Value) -> String {
    format!(
        "  - {}: {}",
        escape_html(key),
        escape_html(&value_text(value))
    )
}

/// Nested structures are pretty-printed with two-space indentation; strings
/// are shown without quotes.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_text(n),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }
}

/// Number text as a JavaScript client would print it: integral floats drop
/// their fraction (`1.0` -> `1`), magnitudes of 1e21 and above or below 1e-6
/// use exponent notation with an explicit sign (`1e+21`, `1.5e-7`).
fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    let Some(f) = n.as_f64() else {
        return n.to_string();
    };

    if f == 0.0 {
        return "0".to_string();
    }

    let magnitude = f.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return f.to_string();
    }

    let exp = format!("{:e}", f);
    match exp.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exp,
    }
}

/// Compose the final message. `formatted_body` must come from
/// [`format_body`]; `country` and `ip` are raw and escaped here.
pub fn build_message(formatted_body: &str, country: &str, ip: &str) -> String {
    let body = if formatted_body.is_empty() {
        EMPTY_BODY
    } else {
        formatted_body
    };

    format!(
        "<b>📩 New message received</b>\n\
         \n\
         <b>📦 Body:</b>\n\
         <pre>{body}</pre>\n\
         \n\
         <b>📍 Connection info:</b>\n\
         Country: <code>{country}</code>\n\
         IP: <code>{ip}</code>",
        body = body,
        country = escape_html(country),
        ip = escape_html(ip),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_or_non_object_body_is_empty() {
        assert_eq!(format_body(None), EMPTY_BODY);
        assert_eq!(format_body(Some(&Value::Null)), EMPTY_BODY);
        assert_eq!(format_body(Some(&json!({}))), EMPTY_BODY);
        assert_eq!(format_body(Some(&json!("just a string"))), EMPTY_BODY);
        assert_eq!(format_body(Some(&json!(42))), EMPTY_BODY);
        assert_eq!(format_body(Some(&json!([]))), EMPTY_BODY);
    }

    #[test]
    fn escapes_string_values() {
        let formatted = format_body(Some(&json!({ "a": "<script>" })));
        assert!(formatted.contains("a: &lt;script&gt;"));
        assert!(!formatted.contains("<script>"));
    }

    #[test]
    fn escapes_keys() {
        let formatted = format_body(Some(&json!({ "<k&>": "v" })));
        assert_eq!(formatted, "- &lt;k&amp;&gt;: v");
    }

    #[test]
    fn keeps_insertion_order() {
        let body: Value = serde_json::from_str(r#"{"zeta": 1, "alpha": true, "mid": "x"}"#).unwrap();
        let formatted = format_body(Some(&body));
        assert_eq!(formatted, "- zeta: 1\n  - alpha: true\n  - mid: x");
    }

    #[test]
    fn nested_values_are_pretty_printed_and_escaped() {
        let formatted = format_body(Some(&json!({ "a": { "b": 1 } })));
        assert_eq!(formatted, "- a: {\n  \"b\": 1\n}");

        let formatted = format_body(Some(&json!({ "tags": ["<x>", "y&z"] })));
        assert!(formatted.contains("&lt;x&gt;"));
        assert!(formatted.contains("y&amp;z"));
        assert!(!formatted.contains("<x>"));
    }

    #[test]
    fn arrays_are_keyed_by_index() {
        let formatted = format_body(Some(&json!(["<a>", 2])));
        assert_eq!(formatted, "- 0: &lt;a&gt;\n  - 1: 2");
    }

    #[test]
    fn numbers_render_like_javascript() {
        let body: Value =
            serde_json::from_str(r#"{"a": 1.0, "b": 1.5, "c": 1e21, "d": 1.5e-7, "e": -3, "f": -0.0}"#)
                .unwrap();
        let formatted = format_body(Some(&body));
        assert_eq!(
            formatted,
            "- a: 1\n  - b: 1.5\n  - c: 1e+21\n  - d: 1.5e-7\n  - e: -3\n  - f: 0"
        );
    }

    #[test]
    fn null_field_renders_as_null() {
        let formatted = format_body(Some(&json!({ "missing": null })));
        assert_eq!(formatted, "- missing: null");
    }

    #[test]
    fn message_embeds_body_and_escaped_metadata() {
        let message = build_message("  - user: x", "Côte <d'Ivoire>", "1.2.3.4");

        assert!(message.starts_with("<b>📩 New message received</b>"));
        assert!(message.contains("<pre>  - user: x</pre>"));
        assert!(message.contains("Country: <code>Côte &lt;d'Ivoire&gt;</code>"));
        assert!(message.ends_with("IP: <code>1.2.3.4</code>"));
    }

    #[test]
    fn message_falls_back_to_placeholder_body() {
        let message = build_message("", "Unknown", "::1");
        assert!(message.contains(&format!("<pre>{EMPTY_BODY}</pre>")));
    }
}
