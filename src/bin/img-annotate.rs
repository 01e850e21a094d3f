//! CLI binary for img-annotate.
//!
//! A thin shim over the library crate: maps CLI flags to `AnnotateConfig`,
//! wires a store and an annotator into a `Pipeline`, then either serves the
//! HTTP surface or annotates a single file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use img_annotate::server::{build_router, AppState};
use img_annotate::{
    build_annotator, pipeline::input, AnnotateConfig, BlobStore, FilesystemStore, MemoryStore,
    Pipeline,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the upload + gallery endpoints
  img-annotate serve --bind 0.0.0.0:8080 --store-dir ./uploads

  # Upload from a shell
  curl -F image=@cat.png http://localhost:8080/upload

  # Annotate one local file and print the record
  img-annotate annotate cat.png

  # Annotate an image from a URL with a specific model
  img-annotate --provider openai --model gpt-4.1-mini annotate https://example.com/cat.jpg

STORED LAYOUT:
  cat.png    the uploaded image
  cat.json   {"description": "...", "caption": "..."}

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (preferred when present)
  GOOGLE_AI_API_KEY       Accepted in place of GEMINI_API_KEY
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter (overrides --verbose / --quiet)
"#;

/// Caption uploaded images with Vision LLMs and store them side by side.
#[derive(Parser, Debug)]
#[command(
    name = "img-annotate",
    version,
    about = "Caption uploaded images with Vision LLMs and store them side by side",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID (default: gemini-1.5-flash).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "IMG_ANNOTATE_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per annotation.
    #[arg(long, global = true, env = "IMG_ANNOTATE_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Longest image side (pixels) sent to the model.
    #[arg(long, global = true, env = "IMG_ANNOTATE_MAX_IMAGE_DIMENSION", default_value_t = 2048)]
    max_image_dimension: u32,

    /// Path to a text file containing a custom instruction prompt.
    #[arg(long, global = true, env = "IMG_ANNOTATE_PROMPT")]
    prompt: Option<PathBuf>,

    /// Blob store backend.
    #[arg(long, global = true, env = "IMG_ANNOTATE_STORE", value_enum, default_value = "fs")]
    store: StoreKind,

    /// Root directory of the filesystem store.
    #[arg(long, global = true, env = "IMG_ANNOTATE_STORE_DIR", default_value = "./uploads")]
    store_dir: PathBuf,

    /// Prefix for public object URLs.
    #[arg(long, global = true, env = "IMG_ANNOTATE_PUBLIC_BASE_URL", default_value = "/media")]
    public_base_url: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IMG_ANNOTATE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IMG_ANNOTATE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (POST /upload, GET /, GET /media/:key).
    Serve {
        /// Address to bind.
        #[arg(long, env = "IMG_ANNOTATE_BIND", default_value = "127.0.0.1:8080")]
        bind: String,

        /// Maximum upload size in bytes.
        #[arg(long, env = "IMG_ANNOTATE_MAX_UPLOAD_BYTES", default_value_t = img_annotate::config::DEFAULT_MAX_UPLOAD_BYTES)]
        max_upload_bytes: usize,
    },

    /// Run one image (path or URL) through the pipeline and print the record.
    Annotate {
        /// Local image path or HTTP/HTTPS URL.
        input: String,

        /// Print the full outcome as JSON instead of the caption only.
        #[arg(long)]
        json: bool,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "IMG_ANNOTATE_DOWNLOAD_TIMEOUT", default_value_t = 60)]
        download_timeout: u64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StoreKind {
    /// One file per key under --store-dir.
    Fs,
    /// Process memory; contents are lost on exit.
    Memory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;
    let store: Arc<dyn BlobStore> = match cli.store {
        StoreKind::Fs => Arc::new(FilesystemStore::new(
            &config.store_dir,
            &config.public_base_url,
        )),
        StoreKind::Memory => Arc::new(MemoryStore::new(&config.public_base_url)),
    };

    match cli.command {
        Command::Serve { .. } => serve(store, &config).await,
        Command::Annotate { input, json, .. } => annotate(store, &config, &input, json).await,
    }
}

async fn serve(store: Arc<dyn BlobStore>, config: &AnnotateConfig) -> Result<()> {
    // A missing credential is a startup condition: keep serving uploads and
    // the gallery, with annotation disabled.
    let annotator = match build_annotator(config) {
        Ok(a) => Some(a),
        Err(e) => {
            warn!("Annotation disabled: {}", e);
            None
        }
    };

    let pipeline = Pipeline::new(store, annotator, config);
    let app = build_router(AppState::new(pipeline), config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(
        "Listening on http://{} (model {})",
        listener.local_addr().context("Failed to read bound address")?,
        config.model_id()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn annotate(
    store: Arc<dyn BlobStore>,
    config: &AnnotateConfig,
    input_str: &str,
    json: bool,
) -> Result<()> {
    let annotator = build_annotator(config).context("No vision model available")?;
    let pipeline = Pipeline::new(store, Some(annotator), config);

    let upload = input::resolve_input(input_str, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to read {input_str}"))?;

    let outcome = pipeline
        .process_upload(Some(upload))
        .await
        .context("Annotation failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
        );
    } else {
        println!("{}", outcome.record.caption);
        println!("{}", outcome.record.description);
        eprintln!(
            "stored {} + {} in {}ms",
            outcome.image_key, outcome.metadata_key, outcome.duration_ms
        );
    }
    Ok(())
}

/// Map CLI args to `AnnotateConfig`.
async fn build_config(cli: &Cli) -> Result<AnnotateConfig> {
    let mut builder = AnnotateConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_image_dimension(cli.max_image_dimension)
        .store_dir(&cli.store_dir)
        .public_base_url(&cli.public_base_url);

    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }

    match cli.command {
        Command::Serve {
            ref bind,
            max_upload_bytes,
        } => {
            builder = builder.bind(bind).max_upload_bytes(max_upload_bytes);
        }
        Command::Annotate {
            download_timeout, ..
        } => {
            builder = builder.download_timeout_secs(download_timeout);
        }
    }

    builder.build().context("Invalid configuration")
}
