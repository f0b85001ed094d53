//! Recovery of JSON objects from raw model output.
//!
//! Models are asked to answer with bare JSON but routinely wrap it in
//! markdown code fences or lead with a sentence of prose. Everything here
//! is best-effort: when no JSON object can be recovered the caller gets a
//! [`ParseError`] and must not guess at partial structure.

use serde_json::Value;

const OPENING_FENCE: &str = "```json";
const CLOSING_FENCE: &str = "```";

#[derive(Debug, thiserror::Error)]
#[error("model output is not recoverable as JSON")]
pub struct ParseError {
    /// The untouched model output, kept for server-side diagnostics.
    pub raw: String,
}

/// Remove every JSON code-fence marker and trim surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace(OPENING_FENCE, "")
        .replace(CLOSING_FENCE, "")
        .trim()
        .to_string()
}

/// Find the first top-level `{ ... }` span whose braces balance and whose
/// contents parse as JSON. Braces inside string literals are ignored, and an
/// object left open at the end of the text yields nothing rather than one of
/// its inner objects.
pub fn extract_json(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut open = 0;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            // Quotes in surrounding prose don't open strings.
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    open = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let candidate = &text[open..=i];
                    if serde_json::from_str::<Value>(candidate).is_ok() {
                        return Some(candidate);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// Strip fences, parse, and fall back to the first embedded JSON object.
pub fn parse_generated_json(raw: &str) -> Result<Value, ParseError> {
    let cleaned = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }
    extract_json(&cleaned)
        .and_then(|extraction| serde_json::from_str::<Value>(extraction).ok())
        .ok_or_else(|| ParseError {
            raw: raw.to_string(),
        })
}
