//! Configuration types for the analysis pipeline and the HTTP service.
//!
//! [`AnalysisConfig`] controls everything a single request does: how text is
//! extracted, which LLM is called and how, and where uploads are staged.
//! [`ServerConfig`] controls the HTTP boundary: bind address, CORS, rate
//! limits and body size. Both are built via builders that validate on
//! [`build`](AnalysisConfigBuilder::build).

use crate::error::SyllabusError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Default chat model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for one document analysis.
///
/// # Example
/// ```rust
/// use syllabus_analyzer::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gpt-4o-mini")
///     .temperature(0.3)
///     .ocr_language("eng+spa")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.3.
    ///
    /// Low values keep the model close to the requested JSON shape.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate. Default: 4096.
    ///
    /// A long schedule table can run past 2 000 output tokens; a truncated
    /// response is unparseable JSON.
    pub max_tokens: usize,

    /// Custom system instruction. If None, uses [`crate::prompts::SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Tesseract language string, e.g. "eng" or "eng+fra". Default: "eng".
    pub ocr_language: String,

    /// Tesseract executable. Default: "tesseract" (resolved via `PATH`).
    pub tesseract_bin: PathBuf,

    /// Directory containing the pdfium shared library.
    /// If None, the working directory and then the system library path are tried.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Longest edge, in pixels, of a PDF page rendered for OCR. Default: 2000.
    pub render_max_pixels: u32,

    /// Directory for staged uploads. If None, uses the OS temp directory.
    pub temp_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.3,
            max_tokens: 4096,
            system_prompt: None,
            ocr_language: "eng".to_string(),
            tesseract_bin: PathBuf::from("tesseract"),
            pdfium_lib_path: None,
            render_max_pixels: 2000,
            temp_dir: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("ocr_language", &self.ocr_language)
            .field("tesseract_bin", &self.tesseract_bin)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("render_max_pixels", &self.render_max_pixels)
            .field("temp_dir", &self.temp_dir)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
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

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.config.tesseract_bin = bin.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn render_max_pixels(mut self, px: u32) -> Self {
        self.config.render_max_pixels = px.max(100);
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, SyllabusError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(SyllabusError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(SyllabusError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on. Default: 127.0.0.1:5000.
    pub bind: SocketAddr,

    /// Production mode restricts CORS to `allowed_origin`. Default: false.
    pub production: bool,

    /// Frontend origin allowed by CORS in production mode.
    /// When None in production, CORS allows any origin.
    pub allowed_origin: Option<String>,

    /// Requests per client per hour. 0 disables the hourly window. Default: 12.
    pub hourly_limit: u32,

    /// Requests per client per day. 0 disables the daily window. Default: 24.
    pub daily_limit: u32,

    /// Key clients by the first `X-Forwarded-For` hop instead of the peer
    /// address. Enable only behind a proxy that sets the header. Default: false.
    pub trust_forwarded_for: bool,

    /// Maximum accepted request body in bytes. Default: 16 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            production: false,
            allowed_origin: None,
            hourly_limit: 12,
            daily_limit: 24,
            trust_forwarded_for: false,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind = addr;
        self
    }

    pub fn production(mut self, v: bool) -> Self {
        self.config.production = v;
        self
    }

    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.allowed_origin = Some(origin.into());
        self
    }

    pub fn hourly_limit(mut self, n: u32) -> Self {
        self.config.hourly_limit = n;
        self
    }

    pub fn daily_limit(mut self, n: u32) -> Self {
        self.config.daily_limit = n;
        self
    }

    pub fn trust_forwarded_for(mut self, v: bool) -> Self {
        self.config.trust_forwarded_for = v;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, SyllabusError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(SyllabusError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if let Some(origin) = &c.allowed_origin {
            if axum::http::HeaderValue::from_str(origin).is_err() {
                return Err(SyllabusError::InvalidConfig(format!(
                    "allowed origin is not a valid header value: {origin:?}"
                )));
            }
        }
        Ok(self.config)
    }
}
