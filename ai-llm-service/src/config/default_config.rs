//! Default LLM configs loaded from configuration variables.
//!
//! Two roles are used by the application:
//!
//! - **Chat**      → answers questions from retrieved context
//! - **Embedding** → vectorizes document chunks and queries
//!
//! # Variables
//!
//! Common:
//! - `LLM_KIND`          = provider kind (`ollama` or `openai`, default `ollama`)
//! - `CHAT_MODEL`        = chat model (mandatory)
//! - `EMBEDDING_MODEL`   = embedding model (mandatory)
//! - `LLM_MAX_TOKENS`    = chat output budget (default 1000)
//! - `LLM_TIMEOUT_SECS`  = chat timeout (default 600)
//! - `EMBED_TIMEOUT_SECS`= embedding timeout (default 60)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory for Ollama)
//!
//! OpenAI-specific:
//! - `OPENAI_URL`     = endpoint (default `https://api.openai.com`)
//! - `OPENAI_API_KEY` = API key (mandatory for OpenAI)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, VarLookup, must_var, opt_u32, opt_u64, opt_var,
        validate_http_endpoint,
    },
};

/// Default chat output budget, in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Resolves the provider from `LLM_KIND` (defaults to Ollama).
pub fn provider(lookup: VarLookup<'_>) -> Result<LlmProvider, AiLlmError> {
    match opt_var(lookup, "LLM_KIND") {
        Some(kind) => Ok(kind.parse::<LlmProvider>()?),
        None => Ok(LlmProvider::Ollama),
    }
}

/// Resolves the Ollama endpoint.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint(lookup: VarLookup<'_>) -> Result<String, AiLlmError> {
    if let Some(url) = opt_var(lookup, "OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_var(lookup, "OLLAMA_PORT") {
        port.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}

/// Endpoint and key for the selected provider.
fn provider_access(
    lookup: VarLookup<'_>,
    provider: LlmProvider,
) -> Result<(String, Option<String>), AiLlmError> {
    match provider {
        LlmProvider::Ollama => Ok((ollama_endpoint(lookup)?, None)),
        LlmProvider::OpenAI => {
            let url =
                opt_var(lookup, "OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
            validate_http_endpoint("OPENAI_URL", &url)?;
            let key = must_var(lookup, "OPENAI_API_KEY")?;
            Ok((url, Some(key)))
        }
    }
}

/// Constructs the **chat** profile.
///
/// # Defaults
/// - `max_tokens = 1000`
/// - `temperature = Some(0.2)`
/// - `timeout_secs = Some(600)`
pub fn config_chat(lookup: VarLookup<'_>) -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider(lookup)?;
    let (endpoint, api_key) = provider_access(lookup, provider)?;
    let model = must_var(lookup, "CHAT_MODEL")?;
    let max_tokens = opt_u32(lookup, "LLM_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS);
    let timeout_secs = opt_u64(lookup, "LLM_TIMEOUT_SECS")?.unwrap_or(600);

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: Some(max_tokens),
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(timeout_secs),
    })
}

/// Constructs the **embedding** profile.
///
/// # Defaults
/// - `temperature = Some(0.0)` (deterministic)
/// - `max_tokens = None`
/// - `timeout_secs = Some(60)`
pub fn config_embedding(lookup: VarLookup<'_>) -> Result<LlmModelConfig, AiLlmError> {
    let provider = provider(lookup)?;
    let (endpoint, api_key) = provider_access(lookup, provider)?;
    let model = must_var(lookup, "EMBEDDING_MODEL")?;
    let timeout_secs = opt_u64(lookup, "EMBED_TIMEOUT_SECS")?.unwrap_or(60);

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(timeout_secs),
    })
}
