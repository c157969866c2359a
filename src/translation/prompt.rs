use crate::error::{GlossaError, GlossaResult};

/// System instruction for backends that accept one
pub fn system_instruction() -> &'static str {
    r#"You are an expert translator. Your task is to translate a JSON array of text strings into a specified target language. The source language will be detected automatically.
- You MUST return a valid JSON array of strings.
- The output array MUST have the exact same number of elements as the input array.
- The order of the translated strings in the output array MUST correspond to the order of the source strings in the input array.
- If a string does not require translation (e.g., it is a number, code, a proper noun, or is already in the target language), return the original string in the corresponding position in the output array.
- Do not add any explanatory text, markdown, or any characters outside of the JSON array in your response.

Example for a target language of Russian:
Input: ["Hello world", "技术规格", "100", "DN50"]
Output: ["Привет, мир", "Технические характеристики", "100", "DN50"]"#
}

pub fn user_prompt(texts: &[String], target_language: &str) -> GlossaResult<String> {
    Ok(format!(
        "Translate the following JSON array into {}:\n{}",
        target_language,
        serde_json::to_string(texts)?
    ))
}

/// Single prompt carrying the rules, for backends without a system role
pub fn standalone_prompt(texts: &[String], target_language: &str) -> GlossaResult<String> {
    Ok(format!(
        r#"Translate the following JSON array of text strings into {lang}. The source language will be detected automatically.
Return ONLY a valid JSON array of strings with the exact same number of elements and in the same order.
Do not add any text or explanation before or after the JSON array.
If a string does not need translation (e.g., it's a number, a formula-like string, or already in the target language), return it as is.

Example Input for Russian:
["Hello world", "技术规格", "100", "DN50"]

Example Response for Russian:
["Привет, мир", "Технические характеристики", "100", "DN50"]

Texts to translate:
{texts}"#,
        lang = target_language,
        texts = serde_json::to_string(texts)?
    ))
}

/// Parse a model reply into exactly `expected` strings.
///
/// Surrounding whitespace and a ```` ```json ```` fence are tolerated.
pub fn parse_string_array(reply: &str, expected: usize, backend: &str) -> GlossaResult<Vec<String>> {
    let cleaned = strip_code_fence(reply);
    let parsed: Vec<String> = serde_json::from_str(cleaned).map_err(|e| {
        GlossaError::Backend(format!(
            "{} returned something other than a JSON array of strings: {}",
            backend, e
        ))
    })?;

    if parsed.len() != expected {
        return Err(GlossaError::Backend(format!(
            "{} returned {} translations for {} texts",
            backend,
            parsed.len(),
            expected
        )));
    }
    Ok(parsed)
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let without_close = without_open.strip_suffix("```").unwrap_or(without_open);
    without_close.trim()
}
