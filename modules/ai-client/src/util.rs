use serde::de::DeserializeOwned;

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code-fence markers from a model reply.
pub fn strip_code_blocks(reply: &str) -> &str {
    reply
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Parse a model reply expected to hold a single JSON object, possibly
/// wrapped in a fenced code block. Callers catch the error and substitute
/// a typed degraded value; the parse failure itself is never propagated
/// past a component boundary.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_blocks(reply))
}
