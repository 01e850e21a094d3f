//! Result types produced by the pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Substituted when the model's JSON has no string `description`.
pub const NO_DESCRIPTION: &str = "No description available";

/// Substituted when the model's JSON has no string `caption`.
pub const NO_CAPTION: &str = "No caption available";

/// Structured annotation stored next to each image as `<stem>.json`.
///
/// Serialised compactly with `description` first, e.g.
/// `{"description":"A cat sitting on a mat","caption":"Cozy cat"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub description: String,
    pub caption: String,
}

impl AnnotationRecord {
    /// Read both fields from a parsed JSON value, falling back to the
    /// defaults for anything missing or not a string.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str, fallback: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            description: field("description", NO_DESCRIPTION),
            caption: field("caption", NO_CAPTION),
        }
    }
}

/// What a fully successful upload produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Key of the stored image, e.g. `cat.png`.
    pub image_key: String,
    /// Key of the stored annotation record, e.g. `cat.json`.
    pub metadata_key: String,
    pub record: AnnotationRecord,
    /// Wall-clock time for the whole pipeline run.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialises_description_first() {
        let record = AnnotationRecord {
            description: "A cat sitting on a mat".into(),
            caption: "Cozy cat".into(),
        };
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"description":"A cat sitting on a mat","caption":"Cozy cat"}"#
        );
    }

    #[test]
    fn from_value_substitutes_non_strings() {
        let record = AnnotationRecord::from_value(&json!({"description": 42, "caption": null}));
        assert_eq!(record.description, NO_DESCRIPTION);
        assert_eq!(record.caption, NO_CAPTION);
    }
}
