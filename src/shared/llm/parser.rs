use lazy_static::lazy_static;
use regex::Regex;

use super::LlmResponse;

lazy_static! {
    /// Trailing commas before } or ]
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();

    /// Single-quoted keys, e.g. {'label': "plastic"}
    static ref SINGLE_QUOTED_KEY_RE: Regex = Regex::new(r"'([A-Za-z_][A-Za-z0-9_]*)'\s*:").unwrap();
}

/// Pull the JSON object out of a model reply.
///
/// Handles ```json fenced blocks, bare fenced blocks, plain objects and an
/// object embedded in surrounding prose.
pub fn extract_json_string(text: &str) -> Result<String, String> {
    if let Some(fenced) = fenced_block(text) {
        return Ok(fenced);
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Ok(trimmed.to_string());
    }

    let start = text
        .find('{')
        .ok_or_else(|| "No JSON object found in reply".to_string())?;
    let end = text
        .rfind('}')
        .ok_or_else(|| "Incomplete JSON object in reply".to_string())?;

    if start < end {
        Ok(text[start..=end].to_string())
    } else {
        Err("Invalid JSON boundaries in reply".to_string())
    }
}

fn fenced_block(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip an optional language tag on the fence line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    let block = body[..close].trim();
    block.starts_with('{').then(|| block.to_string())
}

fn apply_quick_fixes(json_str: &str) -> String {
    let fixed = SINGLE_QUOTED_KEY_RE.replace_all(json_str, "\"$1\":");
    TRAILING_COMMA_RE.replace_all(&fixed, "$1").to_string()
}

fn repair(json_str: &str) -> Option<String> {
    let options = llm_json::RepairOptions::default();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        llm_json::repair_json(json_str, &options)
    }));

    match result {
        Ok(Ok(repaired)) => Some(repaired),
        Ok(Err(e)) => {
            tracing::debug!("JSON repair failed: {:?}", e);
            None
        }
        Err(_) => {
            tracing::warn!("JSON repair panicked");
            None
        }
    }
}

fn try_parse<T: LlmResponse>(text: &str) -> Result<T, String> {
    let json_str = extract_json_string(text)?;

    if let Ok(parsed) = serde_json::from_str::<T>(&json_str) {
        return Ok(parsed);
    }

    let fixed = apply_quick_fixes(&json_str);
    if let Ok(parsed) = serde_json::from_str::<T>(&fixed) {
        tracing::debug!("Reply parsed after quick fixes");
        return Ok(parsed);
    }

    if let Some(repaired) = repair(&json_str) {
        if let Ok(parsed) = serde_json::from_str::<T>(&repaired) {
            tracing::debug!("Reply parsed after llm_json repair");
            return Ok(parsed);
        }
    }

    Err(format!(
        "Unparseable reply: {}",
        json_str.chars().take(120).collect::<String>()
    ))
}

/// Parse a model reply, falling back to a marked default value.
///
/// Callers check `is_success()` to decide whether to trust the fields.
pub fn parse_with_fallback<T: LlmResponse>(text: &str) -> T {
    match try_parse::<T>(text) {
        Ok(parsed) => parsed,
        Err(error_msg) => {
            tracing::debug!("Structured reply parsing failed: {}", error_msg);
            let mut fallback = T::default();
            fallback.mark_as_fallback(error_msg);
            fallback
        }
    }
}
