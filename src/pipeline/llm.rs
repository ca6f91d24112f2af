//! LLM interaction: send the normalised syllabus text and return the raw reply.
//!
//! This module is intentionally thin. Prompt text lives in [`crate::prompts`]
//! and JSON cleanup in [`crate::pipeline::repair`]; here we only assemble
//! the messages, pick a provider and make one call. There is no retry: a
//! failed call fails the request.

use crate::config::{AnalysisConfig, DEFAULT_MODEL};
use crate::error::SyllabusError;
use crate::prompts::{user_message, SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns normalised syllabus text into the model's raw (unrepaired) reply.
#[async_trait]
pub trait SyllabusAnalyzer: Send + Sync {
    async fn analyze(&self, normalized_text: &str) -> Result<String, SyllabusError>;
}

/// [`SyllabusAnalyzer`] backed by an `edgequake_llm` provider.
pub struct LlmAnalyzer {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    system_prompt: Option<String>,
}

impl LlmAnalyzer {
    /// Wrap an already-resolved provider, taking sampling settings from `config`.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalysisConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: config.system_prompt.clone(),
        }
    }

    /// Resolve the provider from `config` and the environment.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, SyllabusError> {
        let provider = resolve_provider(config)?;
        info!(
            "LLM provider resolved (provider={}, model={})",
            config.provider_name.as_deref().unwrap_or("auto"),
            config.model.as_deref().unwrap_or(DEFAULT_MODEL)
        );
        Ok(Self::new(provider, config))
    }

    fn build_messages(&self, normalized_text: &str) -> Vec<ChatMessage> {
        let system = self.system_prompt.as_deref().unwrap_or(SYSTEM_PROMPT);
        vec![
            ChatMessage::system(system),
            ChatMessage::user(user_message(normalized_text)),
        ]
    }
}

#[async_trait]
impl SyllabusAnalyzer for LlmAnalyzer {
    async fn analyze(&self, normalized_text: &str) -> Result<String, SyllabusError> {
        let start = Instant::now();
        let messages = self.build_messages(normalized_text);
        let options = build_options(self.temperature, self.max_tokens);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| {
                warn!("LLM call failed after {:?}: {}", start.elapsed(), e);
                SyllabusError::LlmInvocation {
                    message: e.to_string(),
                }
            })?;

        debug!(
            "LLM: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        debug!("Raw LLM response: {}", response.content);
        Ok(response.content)
    }
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

fn create_provider(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, SyllabusError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        SyllabusError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: e.to_string(),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`, used as-is
/// 2. `config.provider_name` with `config.model` (or [`DEFAULT_MODEL`])
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI, when `OPENAI_API_KEY` is set
/// 5. whatever `ProviderFactory::from_env` detects
pub fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn LLMProvider>, SyllabusError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SyllabusError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
