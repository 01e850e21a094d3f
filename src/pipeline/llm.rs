//! VLM interaction: send the image plus instruction prompt, get raw text back.
//!
//! The pipeline only needs "prompt + image in, text out", which is what the
//! [`Annotator`] trait expresses. [`LlmAnnotator`] implements it on top of any
//! `edgequake_llm` provider; tests substitute their own implementation.
//!
//! No retries: a failed call is reported once and the caller decides whether
//! to resubmit the upload.

use crate::config::AnnotateConfig;
use crate::error::{truncate_for_log, AnnotationFailure};
use crate::pipeline::encode;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Something that can describe an image in text.
///
/// Transient and permanent failures are not distinguished: both surface as
/// an [`AnnotationFailure`].
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(
        &self,
        prompt: &str,
        image: &DynamicImage,
    ) -> Result<String, AnnotationFailure>;
}

/// [`Annotator`] backed by an `edgequake_llm` vision provider.
pub struct LlmAnnotator {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_image_dimension: u32,
}

impl LlmAnnotator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnnotateConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_image_dimension: config.max_image_dimension,
        }
    }
}

#[async_trait]
impl Annotator for LlmAnnotator {
    /// One user turn carrying both the instruction text and the image.
    async fn annotate(
        &self,
        prompt: &str,
        image: &DynamicImage,
    ) -> Result<String, AnnotationFailure> {
        let start = Instant::now();
        // Downscaling and PNG encoding are CPU-bound.
        let owned = image.clone();
        let max_dimension = self.max_image_dimension;
        let image_data =
            tokio::task::spawn_blocking(move || encode::encode_image(&owned, max_dimension))
                .await
                .map_err(|e| AnnotationFailure::Encoding {
                    detail: format!("encode task panicked: {e}"),
                })?
                .map_err(|e| AnnotationFailure::Encoding {
                    detail: e.to_string(),
                })?;

        let messages = vec![ChatMessage::user_with_images(prompt, vec![image_data])];
        let options = build_options(self.temperature, self.max_tokens);

        match self.provider.chat(&messages, Some(&options)).await {
            Ok(response) => {
                debug!(
                    "Annotation: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                if response.content.trim().is_empty() {
                    warn!("Annotation: provider returned an empty completion");
                    return Err(AnnotationFailure::EmptyResponse);
                }
                Ok(response.content)
            }
            Err(e) => {
                let detail = truncate_for_log(&e.to_string());
                warn!("Annotation: provider call failed: {}", detail);
                Err(AnnotationFailure::Provider { detail })
            }
        }
    }
}

/// Sampling options for a single annotation call.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}
