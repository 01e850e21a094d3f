//! Instruction prompt sent to the vision model with every image.
//!
//! The prompt fixes the *expected* shape of the answer: a JSON object with
//! string fields `description` and `caption`. Models do not always obey, which
//! is why [`crate::pipeline::extract`] recovers the object loosely rather than
//! parsing the reply strictly.
//!
//! Callers can override the prompt via [`crate::config::AnnotateConfig::prompt`];
//! the constant here is used only when no override is provided.

/// Default instruction prompt for annotating an uploaded image.
pub const DEFAULT_INSTRUCTION_PROMPT: &str = r#"Analyze the uploaded image and respond in the following JSON format:
{
    "description": "A concise description of the image",
    "caption": "A short caption for the image"
}"#;
