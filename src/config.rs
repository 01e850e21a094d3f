//! Configuration types for the upload-and-annotate pipeline.
//!
//! All behaviour is controlled through [`AnnotateConfig`], built via its
//! [`AnnotateConfigBuilder`]. The config is plain data plus an optional
//! pre-built provider handle; it is resolved once at startup and then passed
//! explicitly into [`crate::annotate::Pipeline`], so nothing in the crate
//! reads process-wide state on the request path.

use crate::error::AnnotateError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default upload body limit: 16 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the annotation pipeline and its HTTP surface.
///
/// # Example
/// ```rust
/// use img_annotate::AnnotateConfig;
///
/// let config = AnnotateConfig::builder()
///     .model("gemini-1.5-flash")
///     .store_dir("/var/lib/gallery")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnnotateConfig {
    /// LLM model identifier. If None, [`DEFAULT_MODEL`] is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    /// If None along with `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate for one annotation. Default: 1024.
    ///
    /// A description plus caption rarely exceeds 200 tokens; the headroom covers
    /// models that wrap their answer in prose.
    pub max_tokens: usize,

    /// Longest side, in pixels, of the image sent to the model. Default: 2048.
    ///
    /// Larger uploads are downscaled before encoding; the stored original is untouched.
    pub max_image_dimension: u32,

    /// Custom instruction prompt. If None, uses [`crate::prompts::DEFAULT_INSTRUCTION_PROMPT`].
    pub prompt: Option<String>,

    /// Root directory of the filesystem blob store. Default: `./uploads`.
    pub store_dir: PathBuf,

    /// Prefix from which public object URLs are derived. Default: `/media`.
    pub public_base_url: String,

    /// Maximum accepted upload body in bytes. Default: 16 MiB.
    pub max_upload_bytes: usize,

    /// Address the HTTP server binds to. Default: `127.0.0.1:8080`.
    pub bind: String,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 1024,
            max_image_dimension: 2048,
            prompt: None,
            store_dir: PathBuf::from("./uploads"),
            public_base_url: "/media".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            bind: "127.0.0.1:8080".to_string(),
            download_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for AnnotateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotateConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_image_dimension", &self.max_image_dimension)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("store_dir", &self.store_dir)
            .field("public_base_url", &self.public_base_url)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("bind", &self.bind)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl AnnotateConfig {
    /// Create a new builder for `AnnotateConfig`.
    pub fn builder() -> AnnotateConfigBuilder {
        AnnotateConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model identifier in effect.
    pub fn model_id(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// The instruction prompt in effect.
    pub fn instruction_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_INSTRUCTION_PROMPT)
    }
}

/// Builder for [`AnnotateConfig`].
#[derive(Debug)]
pub struct AnnotateConfigBuilder {
    config: AnnotateConfig,
}

impl AnnotateConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.config.max_image_dimension = px.max(64);
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.store_dir = dir.into();
        self
    }

    pub fn public_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.public_base_url = url.into();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.bind = addr.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnnotateConfig, AnnotateError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(AnnotateError::InvalidConfig(
                "max upload size must be ≥ 1 byte".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(AnnotateError::InvalidConfig("max tokens must be ≥ 1".into()));
        }
        if c.prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(AnnotateError::InvalidConfig(
                "instruction prompt must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
