//! The upload-and-annotate orchestrator.
//!
//! [`Pipeline::process_upload`] drives one upload through five states:
//!
//! ```text
//! Received ─▶ Validated ─▶ ImageStored ─▶ Annotated ─▶ MetadataStored
//!    │            │             │             │
//!    └─ 400       └─ 500        └─ 500        └─ 500   (failure exits)
//! ```
//!
//! The image is written before the model is called so a user-visible image
//! exists even when annotation fails; nothing is rolled back. An image
//! without a `.json` record is an accepted outcome. Every external call is
//! made exactly once.

use crate::config::AnnotateConfig;
use crate::error::{truncate_for_log, AnnotateError, AnnotationFailure, StoreError};
use crate::output::UploadOutcome;
use crate::pipeline::extract::extract_annotation;
use crate::pipeline::llm::{Annotator, LlmAnnotator};
use crate::pipeline::validate::{validate_upload, Upload};
use crate::store::{metadata_key, BlobStore};
use edgequake_llm::{GeminiProvider, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Position of an upload in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Received,
    Validated,
    ImageStored,
    Annotated,
    MetadataStored,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::Received => "received",
            UploadStage::Validated => "validated",
            UploadStage::ImageStored => "image_stored",
            UploadStage::Annotated => "annotated",
            UploadStage::MetadataStored => "metadata_stored",
        };
        f.write_str(name)
    }
}

/// Store, annotator and prompt wired together.
///
/// Cheap to clone; every clone shares the same store and annotator handles.
#[derive(Clone)]
pub struct Pipeline {
    store: Arc<dyn BlobStore>,
    annotator: Option<Arc<dyn Annotator>>,
    prompt: Arc<str>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("annotation_enabled", &self.annotation_enabled())
            .field("prompt_len", &self.prompt.len())
            .finish()
    }
}

impl Pipeline {
    /// `annotator = None` runs with annotation disabled: images are still
    /// stored, but every upload ends in [`AnnotationFailure::Unconfigured`].
    pub fn new(
        store: Arc<dyn BlobStore>,
        annotator: Option<Arc<dyn Annotator>>,
        config: &AnnotateConfig,
    ) -> Self {
        Self {
            store,
            annotator,
            prompt: Arc::from(config.instruction_prompt()),
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub fn annotation_enabled(&self) -> bool {
        self.annotator.is_some()
    }

    /// Run one upload through the whole pipeline.
    ///
    /// `None` means the request carried no file. On error the returned
    /// [`AnnotateError`] tells the caller which status class to answer with;
    /// whatever was written before the failure stays written.
    pub async fn process_upload(
        &self,
        upload: Option<Upload>,
    ) -> Result<UploadOutcome, AnnotateError> {
        let start = Instant::now();
        let filename = upload
            .as_ref()
            .and_then(|u| u.filename.clone())
            .unwrap_or_default();

        let mut stage = UploadStage::Received;
        let result = self.run(upload, &mut stage, start).await;

        if let Err(ref e) = result {
            warn!(
                filename = %truncate_for_log(&filename),
                stage = %stage,
                "Upload failed: {}",
                truncate_for_log(&e.to_string())
            );
        }
        result
    }

    async fn run(
        &self,
        upload: Option<Upload>,
        stage: &mut UploadStage,
        start: Instant,
    ) -> Result<UploadOutcome, AnnotateError> {
        // ── Received → Validated ─────────────────────────────────────────
        let validated = tokio::task::spawn_blocking(move || validate_upload(upload))
            .await
            .map_err(|e| AnnotateError::Internal(format!("Validation task panicked: {e}")))??;
        advance(stage, UploadStage::Validated, &validated.key);

        // ── Validated → ImageStored ──────────────────────────────────────
        self.store
            .put(&validated.key, &validated.bytes, &validated.content_type)
            .await?;
        advance(stage, UploadStage::ImageStored, &validated.key);

        // ── ImageStored → Annotated ──────────────────────────────────────
        let annotator = self
            .annotator
            .as_ref()
            .ok_or(AnnotationFailure::Unconfigured)?;
        let raw = annotator.annotate(&self.prompt, &validated.image).await?;
        advance(stage, UploadStage::Annotated, &validated.key);

        // ── Annotated → MetadataStored ───────────────────────────────────
        let record = extract_annotation(&raw).inspect_err(|_| {
            debug!("Unparseable AI response: {:?}", truncate_for_log(&raw));
        })?;
        let meta_key = metadata_key(&validated.key);
        let body = serde_json::to_vec(&record).map_err(StoreError::from)?;
        self.store.put(&meta_key, &body, "application/json").await?;
        advance(stage, UploadStage::MetadataStored, &meta_key);

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Annotated '{}' → '{}' in {}ms",
            validated.key, meta_key, duration_ms
        );

        Ok(UploadOutcome {
            image_key: validated.key,
            metadata_key: meta_key,
            record,
            duration_ms,
        })
    }
}

fn advance(stage: &mut UploadStage, next: UploadStage, key: &str) {
    debug!("{}: {} → {}", key, stage, next);
    *stage = next;
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Build the production annotator from config.
///
/// Called once at startup; a failure here means annotation is unavailable
/// for the lifetime of the process.
pub fn build_annotator(config: &AnnotateConfig) -> Result<Arc<dyn Annotator>, AnnotateError> {
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmAnnotator::new(provider, config)))
}

/// Default vision model for a named provider when none is configured.
fn default_model_for(provider_name: &str) -> &'static str {
    match provider_name {
        "openai" | "azure" => "gpt-4.1-nano",
        "anthropic" => "claude-sonnet-4-20250514",
        "ollama" | "lmstudio" => "llava",
        _ => crate::config::DEFAULT_MODEL,
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AnnotateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AnnotateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Environment variables that may hold a Google AI key, in lookup order.
const GEMINI_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_AI_API_KEY"];

/// First non-blank Google AI key among [`GEMINI_KEY_VARS`].
fn gemini_api_key(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    GEMINI_KEY_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|key| !key.trim().is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or the
///    provider's default vision model.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **Gemini key** (`GEMINI_API_KEY`, or `GOOGLE_AI_API_KEY`). The default
///    model is a Gemini model, so Gemini wins when several keys are present.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &AnnotateConfig) -> Result<Arc<dyn LLMProvider>, AnnotateError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_model_for(name));
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    if let Some(api_key) = gemini_api_key(|name| std::env::var(name).ok()) {
        debug!("Using Gemini from API key, model {}", config.model_id());
        return Ok(Arc::new(
            GeminiProvider::new(api_key).with_model(config.model_id()),
        ));
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AnnotateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY (or GOOGLE_AI_API_KEY), OPENAI_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
