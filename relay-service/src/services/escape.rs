//! Escaping for text embedded in Telegram's HTML parse mode.

/// Escape `&`, `<` and `>` so `text` renders literally inside HTML markup.
///
/// Apply exactly once per value: the output is not idempotent, a second pass
/// turns `&lt;` into `&amp;lt;`.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}
