use std::sync::Arc;

use ai_llm_service::{ChatModel, EmbeddingModel, LlmServiceProfiles};
use chat_history::{HistoryStore, RemoteHistory, SessionRegistry};
use rag_store::{PdfToText, RagError, TextExtractor, VectorIndex, restore_index};
use storage::{HttpObjectStore, LocalObjectStore, ObjectStore};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::core::config::{AppConfig, ConfigError, ObjectStoreConfig};

const OBJECT_STORE_TIMEOUT_SECS: u64 = 60;
const HEALTH_TIMEOUT_SECS: u64 = 10;

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub config: AppConfig,
    pub embedder: Arc<dyn EmbeddingModel>,
    pub chat: Arc<dyn ChatModel>,
    pub extractor: Arc<dyn TextExtractor>,
    pub object_store: Option<Arc<dyn ObjectStore>>,
    /// Provider clients, when running against real services (health probes).
    pub profiles: Option<Arc<LlmServiceProfiles>>,
    pub sessions: SessionRegistry,
    pub history: HistoryStore,
    /// Last built or loaded index; replaced wholesale by a rebuild.
    pub index: RwLock<Option<Arc<VectorIndex>>>,
    /// One pipeline operation (build or ask) at a time.
    pub pipeline: Mutex<()>,
}

impl AppState {
    /// Load shared state from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(AppConfig::from_env()?)
    }

    /// Wires real providers, `pdftotext` and the configured object store.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let profiles = Arc::new(LlmServiceProfiles::new(
            config.chat.clone(),
            config.embedding.clone(),
            Some(HEALTH_TIMEOUT_SECS),
        )?);
        let object_store = build_object_store(&config.object_store)?;
        let extractor = Arc::new(PdfToText::new(config.pdftotext_bin.clone()));

        let mut state = Self::new(
            config,
            profiles.clone(),
            profiles.clone(),
            extractor,
            object_store,
        );
        state.profiles = Some(profiles);
        Ok(state)
    }

    /// Assembles state from explicit capabilities.
    pub fn new(
        config: AppConfig,
        embedder: Arc<dyn EmbeddingModel>,
        chat: Arc<dyn ChatModel>,
        extractor: Arc<dyn TextExtractor>,
        object_store: Option<Arc<dyn ObjectStore>>,
    ) -> Self {
        let remote = object_store.as_ref().map(|store| RemoteHistory {
            store: store.clone(),
            key: config.history_object_key.clone(),
        });
        let history = HistoryStore::new(config.history_file.clone(), remote);
        let sessions = SessionRegistry::with_idle_ttl(config.session_idle_ttl);
        Self {
            config,
            embedder,
            chat,
            extractor,
            object_store,
            profiles: None,
            sessions,
            history,
            index: RwLock::new(None),
            pipeline: Mutex::new(()),
        }
    }

    /// Cached index, or the one persisted on disk (restored from the object
    /// store first when the local directory is missing).
    pub async fn current_index(&self) -> Result<Arc<VectorIndex>, RagError> {
        if let Some(index) = self.index.read().await.as_ref() {
            return Ok(index.clone());
        }

        let dir = &self.config.index_dir;
        let model = Some(self.embedder.model_id());
        let loaded = match VectorIndex::load(dir, model).await {
            Err(RagError::IndexMissing(_)) => {
                let restored = match &self.object_store {
                    Some(store) => {
                        restore_index(store.as_ref(), &self.config.index_key_prefix, dir).await?
                    }
                    None => false,
                };
                if !restored {
                    return Err(RagError::IndexMissing(dir.clone()));
                }
                VectorIndex::load(dir, model).await?
            }
            other => other?,
        };

        let loaded = Arc::new(loaded);
        *self.index.write().await = Some(loaded.clone());
        debug!("app_state: index cache filled from {}", dir.display());
        Ok(loaded)
    }

    pub async fn replace_index(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let index = Arc::new(index);
        *self.index.write().await = Some(index.clone());
        info!(count = index.len(), "index cache replaced");
        index
    }
}

fn build_object_store(cfg: &ObjectStoreConfig) -> Result<Option<Arc<dyn ObjectStore>>, ConfigError> {
    let invalid = |e: storage::StorageError| ConfigError::Invalid {
        var: "OBJECT_STORE",
        reason: e.to_string(),
    };
    Ok(match cfg {
        ObjectStoreConfig::None => None,
        ObjectStoreConfig::Local { root, bucket } => {
            let store = LocalObjectStore::new(root, bucket).map_err(invalid)?;
            info!(location = %store.describe(), "object store: local bucket");
            Some(Arc::new(store) as Arc<dyn ObjectStore>)
        }
        ObjectStoreConfig::Http { url, bucket, token } => {
            let store =
                HttpObjectStore::new(url, bucket, token.clone(), OBJECT_STORE_TIMEOUT_SECS)
                    .map_err(invalid)?;
            info!(location = %store.describe(), "object store: http bucket");
            Some(Arc::new(store) as Arc<dyn ObjectStore>)
        }
    })
}
