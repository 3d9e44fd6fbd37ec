//! The completion seam: a single injectable request/response capability.
//!
//! Everything that talks to an LLM — the per-page correction call and the
//! vision transcription fallback — goes through [`CompletionBackend`], a
//! one-method trait. The production implementation wraps an
//! `Arc<dyn LLMProvider>`; tests substitute fakes that fail on schedule,
//! count concurrent entries, or return canned text. Keeping the seam this
//! narrow means the retry unit and the scheduler can be exercised without
//! any network at all.

use crate::config::TranscriptConfig;
use crate::error::TranscriptError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use thiserror::Error;

/// A failed completion attempt. Always treated as transient by the retry
/// unit; permanence emerges only from exhausting the retry budget.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CompletionError(pub String);

/// A single request/response completion capability.
///
/// Implementations may be slow, rate-limited, and transiently failing; the
/// caller owns retries. The trait has no knowledge of pages, ordering, or
/// concurrency limits.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issue one completion request and return the response text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CompletionError>;
}

/// Production backend: forwards to an `edgequake-llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CompletionBackend for LlmBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        match self.provider.chat(messages, Some(options)).await {
            Ok(response) => Ok(response.content),
            Err(e) => Err(CompletionError(format!("{e}"))),
        }
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, TranscriptError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TranscriptError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the completion backend, from most-specific to least-specific.
///
/// The fallback chain lets library users and CLI users each set exactly as
/// much or as little as they need:
///
/// 1. **Injected backend** (`config.backend`) — the caller constructed the
///    backend entirely; we use it as-is. This is the test seam.
///
/// 2. **Named provider + model** (`config.provider_name`) — reads the
///    corresponding API key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** — `EDGEQUAKE_LLM_PROVIDER` (and optionally
///    `EDGEQUAKE_MODEL`) select the provider without touching the config,
///    for users who set them once in their shell profile.
///
/// 4. **OPENAI_API_KEY present** — users with multiple provider keys default
///    to OpenAI unless they explicitly request another provider.
///
/// 5. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans all known API key variables and picks the first available
///    provider.
///
/// Resolution happens before any page work begins, so a missing credential
/// aborts the run up front rather than failing 6 pages in.
pub fn resolve_backend(
    config: &TranscriptConfig,
) -> Result<Arc<dyn CompletionBackend>, TranscriptError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    let model = config.model.as_deref().unwrap_or("gpt-4o-mini");

    if let Some(ref name) = config.provider_name {
        return Ok(Arc::new(LlmBackend::new(create_provider(name, model)?)));
    }

    if let Some((name, env_model)) = env_provider_pair() {
        let model = config
            .model
            .clone()
            .or(env_model)
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        return Ok(Arc::new(LlmBackend::new(create_provider(&name, &model)?)));
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return Ok(Arc::new(LlmBackend::new(create_provider("openai", model)?)));
        }
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranscriptError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(Arc::new(LlmBackend::new(provider)))
}

/// The `EDGEQUAKE_LLM_PROVIDER`/`EDGEQUAKE_MODEL` environment pair, if the
/// provider half is set and non-empty.
fn env_provider_pair() -> Option<(String, Option<String>)> {
    let provider = std::env::var("EDGEQUAKE_LLM_PROVIDER")
        .ok()
        .filter(|p| !p.is_empty())?;
    let model = std::env::var("EDGEQUAKE_MODEL")
        .ok()
        .filter(|m| !m.is_empty());
    Some((provider, model))
}
