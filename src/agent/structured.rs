//! Validation of structured model output.
//!
//! Models are asked for JSON matching a schema, but what comes back may
//! still be wrapped in code fences or tags, or be nested under a wrapper
//! key. [`parse_structured`] tolerates those shapes and reports anything
//! else as [`AgentError::ResponseParse`]; callers decide whether to fail
//! closed.

use serde::de::DeserializeOwned;

use crate::error::AgentError;

/// Removes markdown code fences or a single pair of XML-style tags.
#[must_use]
pub fn strip_wrapping(content: &str) -> &str {
    let trimmed = content.trim();

    if trimmed.starts_with("```") {
        let inner = trimmed.trim_start_matches('`');
        let inner = inner
            .strip_prefix("json")
            .or_else(|| inner.strip_prefix("JSON"))
            .unwrap_or(inner);
        return inner.trim_end_matches('`').trim();
    }

    if let Some(rest) = trimmed.strip_prefix('<')
        && let Some(end) = rest.find('>')
    {
        let tag = &rest[..end];
        let closing = format!("</{tag}>");
        if !tag.is_empty()
            && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && let Some(body) = rest[end + 1..].strip_suffix(closing.as_str())
        {
            return body.trim();
        }
    }

    trimmed
}

/// Parses model output into `T`.
///
/// Tries the whole payload first, then the value under `wrapper_key` when the
/// payload is an object (e.g. `{"issues": [...]}` for a list type).
///
/// # Errors
///
/// Returns [`AgentError::ResponseParse`] when neither shape matches.
pub fn parse_structured<T: DeserializeOwned>(
    content: &str,
    wrapper_key: Option<&str>,
) -> Result<T, AgentError> {
    let json_str = strip_wrapping(content);

    let direct_err = match serde_json::from_str::<T>(json_str) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(key) = wrapper_key
        && let Ok(serde_json::Value::Object(mut map)) =
            serde_json::from_str::<serde_json::Value>(json_str)
        && let Some(inner) = map.remove(key)
        && let Ok(value) = serde_json::from_value::<T>(inner)
    {
        return Ok(value);
    }

    let preview: String = json_str.chars().take(200).collect();
    Err(AgentError::ResponseParse {
        message: format!(
            "{direct_err}. Response length: {} bytes, preview: {preview:?}",
            json_str.len()
        ),
        content: content.to_string(),
    })
}
