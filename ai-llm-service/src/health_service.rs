//! Health probes for the configured chat and embedding backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, model looked up by name
//! - OpenAI: `GET {endpoint}/v1/models` with Bearer auth, model looked up by id
//!
//! [`HealthService::check`] never fails; any error becomes `ok = false` in the
//! returned [`HealthStatus`], which the HTTP layer serves as-is.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for one profile.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Reuses one HTTP client for all probes.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a health service with an optional probe timeout (seconds, default 10).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Probes one profile. Never returns an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let started = Instant::now();
        let probe = match cfg.provider {
            LlmProvider::Ollama => self.probe_ollama(cfg).await,
            LlmProvider::OpenAI => self.probe_openai(cfg).await,
        };
        let latency = started.elapsed().as_millis();

        let status = match probe {
            Ok(true) => HealthStatus::new(cfg, true, latency, "reachable; model is available"),
            Ok(false) => HealthStatus::new(cfg, false, latency, "reachable; model not found"),
            Err(err) => HealthStatus::new(cfg, false, latency, err.to_string()),
        };

        if status.ok {
            info!(
                provider = %status.provider,
                model = %status.model,
                latency_ms = status.latency_ms,
                "health probe completed"
            );
        } else {
            warn!(
                provider = %status.provider,
                model = %status.model,
                latency_ms = status.latency_ms,
                message = %status.message,
                "health probe failed"
            );
        }
        status
    }

    /// Probes several profiles sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        debug!(count = configs.len(), "running health probes");
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn probe_ollama(&self, cfg: &LlmModelConfig) -> Result<bool, AiLlmError> {
        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            #[serde(default)]
            models: Vec<Tag>,
        }

        let url = format!("{}/api/tags", cfg.endpoint.trim_end_matches('/'));
        let resp = self.client.get(&url).timeout(self.timeout(cfg)).send().await?;
        let resp = Self::ensure_success(resp, url).await?;
        let tags: Tags = resp
            .json()
            .await
            .map_err(|e| HealthError::Decode(format!("/api/tags: {e}")))?;

        // Ollama reports `name:latest` for models pulled without a tag.
        Ok(tags
            .models
            .iter()
            .any(|m| m.name == cfg.model || m.name == format!("{}:latest", cfg.model)))
    }

    async fn probe_openai(&self, cfg: &LlmModelConfig) -> Result<bool, AiLlmError> {
        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        let key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| HealthError::Decode("missing OpenAI API key".into()))?;

        let url = format!("{}/v1/models", cfg.endpoint.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout(cfg))
            .header(header::AUTHORIZATION, format!("Bearer {key}"))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, url).await?;
        let models: Models = resp
            .json()
            .await
            .map_err(|e| HealthError::Decode(format!("/v1/models: {e}")))?;

        Ok(models.data.iter().any(|m| m.id == cfg.model))
    }

    fn timeout(&self, cfg: &LlmModelConfig) -> Duration {
        cfg.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
            .min(self.default_timeout)
    }

    async fn ensure_success(
        resp: reqwest::Response,
        url: String,
    ) -> Result<reqwest::Response, AiLlmError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let snippet = make_snippet(&resp.text().await.unwrap_or_default());
        Err(HealthError::HttpStatus(HttpError {
            status,
            url,
            snippet,
        })
        .into())
    }
}
