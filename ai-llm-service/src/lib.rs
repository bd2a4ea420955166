//! Shared LLM access for the application: provider clients (Ollama, OpenAI),
//! env-driven configs, health probes, and the two capabilities the RAG
//! pipeline depends on ([`EmbeddingModel`] and [`ChatModel`]).

pub mod capabilities;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use capabilities::{BoxFuture, ChatModel, EmbeddingModel};
pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, ConfigError, Result};
pub use health_service::{HealthService, HealthStatus};
pub use service_profiles::LlmServiceProfiles;
