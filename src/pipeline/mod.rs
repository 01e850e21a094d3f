//! Pipeline stages for upload annotation.
//!
//! Each submodule implements exactly one step so it can be tested without
//! the others; [`crate::annotate::Pipeline`] wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ store ──▶ encode ──▶ llm ──▶ extract ──▶ store
//! (key+decode) (image)   (base64)   (VLM)   (JSON)     (record)
//! ```
//!
//! 1. [`validate`]: allow-list the extension, sanitize the key, decode bytes
//!    under size limits; CPU-bound, so the orchestrator runs it in `spawn_blocking`
//! 2. [`encode`]: downscale and base64-wrap the decoded image (also `spawn_blocking`)
//! 3. [`llm`]: the only stage with network I/O; one attempt, no retry
//! 4. [`extract`]: recover `{description, caption}` from noisy model text
//!
//! [`input`] sits outside the request path: it turns a CLI argument (path or
//! URL) into an [`validate::Upload`].

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod validate;
