//! Application configuration resolved from environment variables.
//!
//! Every value can be overridden through the process environment (or a
//! `.env` file loaded by the binary). Resolution goes through a lookup
//! closure so tests never touch the real environment.

use std::{path::PathBuf, str::FromStr, time::Duration};

use ai_llm_service::{
    AiLlmError, LlmModelConfig,
    config::default_config::{config_chat, config_embedding},
    error_handler::{VarLookup, opt_var, process_env},
};
use rag_store::{DistanceKind, RagConfig, RagError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error(transparent)]
    Llm(#[from] AiLlmError),

    #[error(transparent)]
    Rag(#[from] RagError),
}

/// Where index artifacts and chat history are mirrored.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectStoreConfig {
    None,
    /// Directory bucket: `{root}/{bucket}/{key}`.
    Local { root: PathBuf, bucket: String },
    /// HTTP bucket: `PUT {url}/{bucket}/{key}`.
    Http {
        url: String,
        bucket: String,
        token: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_address: String,
    pub data_dir: PathBuf,
    pub index_dir: PathBuf,
    pub history_file: PathBuf,
    pub rag: RagConfig,
    pub llm_max_tokens: u32,
    pub max_upload_bytes: usize,
    pub pdftotext_bin: String,
    pub object_store: ObjectStoreConfig,
    pub index_key_prefix: String,
    pub history_object_key: String,
    /// Chat sessions idle for longer than this are dropped.
    pub session_idle_ttl: Duration,
    pub chat: LlmModelConfig,
    pub embedding: LlmModelConfig,
}

/// Name the uploaded PDF is stored under, inside `data_dir`.
pub const UPLOADED_FILE_NAME: &str = "uploaded_file.pdf";

const DEFAULT_BUCKET: &str = "learn-smart-rag";

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: VarLookup<'_>) -> Result<Self, ConfigError> {
        let defaults = RagConfig::default();
        let rag = RagConfig {
            chunk_size: parse_or(lookup, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(lookup, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            top_k: parse_or(lookup, "RAG_TOP_K", defaults.top_k)?,
            distance: match opt_var(lookup, "RAG_DISTANCE") {
                Some(v) => v.parse::<DistanceKind>()?,
                None => defaults.distance,
            },
            embed_concurrency: parse_or(lookup, "EMBED_CONCURRENCY", defaults.embed_concurrency)?,
        };
        rag.validate()?;

        let chat = config_chat(lookup)?;
        let embedding = config_embedding(lookup)?;

        Ok(Self {
            api_address: string_or(lookup, "API_ADDRESS", "127.0.0.1:8501"),
            data_dir: string_or(lookup, "DATA_DIR", "data").into(),
            index_dir: string_or(lookup, "INDEX_DIR", "vector_index").into(),
            history_file: string_or(lookup, "HISTORY_FILE", "chat_history.json").into(),
            rag,
            llm_max_tokens: chat
                .max_tokens
                .unwrap_or(ai_llm_service::config::default_config::DEFAULT_MAX_TOKENS),
            max_upload_bytes: parse_or(lookup, "MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
            pdftotext_bin: string_or(lookup, "PDFTOTEXT_BIN", "pdftotext"),
            object_store: object_store(lookup)?,
            index_key_prefix: string_or(lookup, "INDEX_KEY_PREFIX", "vector_index"),
            history_object_key: string_or(
                lookup,
                "HISTORY_OBJECT_KEY",
                "chat_history/chat_history.json",
            ),
            session_idle_ttl: Duration::from_secs(parse_or(
                lookup,
                "SESSION_IDLE_TTL_SECS",
                chat_history::DEFAULT_IDLE_TTL.as_secs(),
            )?),
            chat,
            embedding,
        })
    }
}

fn object_store(lookup: VarLookup<'_>) -> Result<ObjectStoreConfig, ConfigError> {
    let bucket = string_or(lookup, "OBJECT_STORE_BUCKET", DEFAULT_BUCKET);
    let kind = opt_var(lookup, "OBJECT_STORE").unwrap_or_else(|| "none".into());
    match kind.trim().to_ascii_lowercase().as_str() {
        "none" | "off" => Ok(ObjectStoreConfig::None),
        "local" => Ok(ObjectStoreConfig::Local {
            root: opt_var(lookup, "OBJECT_STORE_ROOT")
                .ok_or(ConfigError::Missing("OBJECT_STORE_ROOT"))?
                .into(),
            bucket,
        }),
        "http" => Ok(ObjectStoreConfig::Http {
            url: opt_var(lookup, "OBJECT_STORE_URL").ok_or(ConfigError::Missing("OBJECT_STORE_URL"))?,
            bucket,
            token: opt_var(lookup, "OBJECT_STORE_TOKEN"),
        }),
        other => Err(ConfigError::Invalid {
            var: "OBJECT_STORE",
            reason: format!("expected none, local or http, got {other:?}"),
        }),
    }
}

fn string_or(lookup: VarLookup<'_>, name: &str, default: &str) -> String {
    opt_var(lookup, name).unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(lookup: VarLookup<'_>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match opt_var(lookup, name) {
        Some(v) => v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var: name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const MODELS: [(&str, &str); 3] = [
        ("OLLAMA_URL", "http://localhost:11434"),
        ("CHAT_MODEL", "llama3.1:8b"),
        ("EMBEDDING_MODEL", "nomic-embed-text"),
    ];

    #[test]
    fn defaults() {
        let lookup = lookup_from(&MODELS);
        let cfg = AppConfig::from_lookup(&lookup).unwrap();
        assert_eq!(cfg.api_address, "127.0.0.1:8501");
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.index_dir, PathBuf::from("vector_index"));
        assert_eq!(cfg.rag, RagConfig::default());
        assert_eq!(cfg.llm_max_tokens, 1000);
        assert_eq!(cfg.max_upload_bytes, 52_428_800);
        assert_eq!(cfg.object_store, ObjectStoreConfig::None);
        assert_eq!(cfg.history_object_key, "chat_history/chat_history.json");
        assert_eq!(cfg.session_idle_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn overrides_and_object_store() {
        let mut pairs = MODELS.to_vec();
        pairs.extend([
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("RAG_DISTANCE", "cosine"),
            ("OBJECT_STORE", "http"),
            ("OBJECT_STORE_URL", "http://minio:9000"),
            ("OBJECT_STORE_TOKEN", "t"),
            ("SESSION_IDLE_TTL_SECS", "90"),
        ]);
        let lookup = lookup_from(&pairs);
        let cfg = AppConfig::from_lookup(&lookup).unwrap();
        assert_eq!(cfg.rag.chunk_size, 500);
        assert_eq!(cfg.rag.distance, DistanceKind::Cosine);
        assert_eq!(cfg.session_idle_ttl, Duration::from_secs(90));
        assert_eq!(
            cfg.object_store,
            ObjectStoreConfig::Http {
                url: "http://minio:9000".into(),
                bucket: "learn-smart-rag".into(),
                token: Some("t".into()),
            }
        );
    }

    #[test]
    fn rejects_bad_values() {
        let mut pairs = MODELS.to_vec();
        pairs.push(("CHUNK_SIZE", "lots"));
        assert!(matches!(
            AppConfig::from_lookup(&lookup_from(&pairs)),
            Err(ConfigError::Invalid { var: "CHUNK_SIZE", .. })
        ));

        let mut pairs = MODELS.to_vec();
        pairs.push(("CHUNK_OVERLAP", "20000"));
        assert!(matches!(
            AppConfig::from_lookup(&lookup_from(&pairs)),
            Err(ConfigError::Rag(_))
        ));

        let mut pairs = MODELS.to_vec();
        pairs.push(("OBJECT_STORE", "local"));
        assert!(matches!(
            AppConfig::from_lookup(&lookup_from(&pairs)),
            Err(ConfigError::Missing("OBJECT_STORE_ROOT"))
        ));

        assert!(matches!(
            AppConfig::from_lookup(&lookup_from(&[])),
            Err(ConfigError::Llm(_))
        ));
    }
}
