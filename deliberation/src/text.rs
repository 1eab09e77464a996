//! Small string helpers shared by prompt builders and output parsers.

/// Cut `text` to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Remove markdown code fences (```json / ```) that models wrap around JSON.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Slice from the first `open` to the last `close` delimiter, inclusive.
///
/// Models often add prose around a JSON payload; this isolates the payload.
pub fn json_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_truncate_multibyte() {
        // "Görüş" has multibyte chars; slicing by bytes would panic.
        assert_eq!(truncate_chars("Görüş bildir", 5), "Görüş");
    }

    #[test]
    fn test_strip_code_fences() {
        let raw = "```json\n[\"A\", \"B\"]\n```";
        assert_eq!(strip_code_fences(raw), "[\"A\", \"B\"]");
    }

    #[test]
    fn test_json_span() {
        let raw = "Here you go: {\"decision\": \"A\"} thanks";
        assert_eq!(json_span(raw, '{', '}'), Some("{\"decision\": \"A\"}"));
        assert_eq!(json_span("no json", '{', '}'), None);
        assert_eq!(json_span("} backwards {", '{', '}'), None);
    }
}
