//! Response extraction: recover an [`AnnotationRecord`] from raw model text.
//!
//! Vision models are asked for bare JSON but regularly answer with
//! ` ```json … ``` ` fences, a sentence of preamble, or both. Extraction is a
//! best-effort recovery, not a strict parser:
//!
//! 1. reject empty text,
//! 2. strip an outer code fence,
//! 3. take everything from the first `{` to the last `}`,
//! 4. parse that slice as JSON (no repair on failure),
//! 5. read `description` / `caption`, substituting defaults field by field.
//!
//! Steps 1, 3 and 4 are fatal ([`ExtractionError`]); step 5 never fails.

use crate::error::ExtractionError;
use crate::output::AnnotationRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*`+\s*(?:json)?").unwrap());

static RE_TRAILING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`+\s*$").unwrap());

/// Turn raw model output into an annotation record.
pub fn extract_annotation(raw: &str) -> Result<AnnotationRecord, ExtractionError> {
    if raw.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }

    let text = strip_code_fences(raw);

    let start = text.find('{').ok_or(ExtractionError::NoJsonFound)?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or(ExtractionError::NoJsonFound)?;

    let value: Value = serde_json::from_str(&text[start..=end]).map_err(|e| {
        ExtractionError::MalformedJson {
            detail: e.to_string(),
        }
    })?;

    Ok(AnnotationRecord::from_value(&value))
}

/// Remove a leading ```` ```json ```` marker and trailing backticks.
fn strip_code_fences(input: &str) -> String {
    let s = RE_LEADING_FENCE.replace(input, "");
    RE_TRAILING_FENCE.replace(&s, "").trim().to_string()
}
