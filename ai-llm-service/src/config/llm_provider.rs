use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for embeddings and chat completion.
///
/// Adding more providers (e.g., a hosted Anthropic or Bedrock endpoint) is done
/// by extending this enum and routing it in
/// [`LlmServiceProfiles`](crate::service_profiles::LlmServiceProfiles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Ollama runtime (local or remote).
    Ollama,
    /// OpenAI-compatible REST API.
    OpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
