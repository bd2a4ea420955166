//! Chat sessions and their durable history.
//!
//! A [`ChatSession`] lives in the [`SessionRegistry`] for as long as the
//! conversation runs; "end chat" drains it into the [`HistoryStore`].

mod errors;
mod session;
mod store;

pub use errors::HistoryError;
pub use session::{ChatSession, ChatTurn, DEFAULT_IDLE_TTL, EndChatOutcome, SessionRegistry};
pub use store::{HistoryStore, RemoteHistory};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use storage::{BoxFuture, LocalObjectStore, ObjectStore, StorageError};

    use super::*;

    /// A bucket that rejects every write.
    struct DownStore;

    impl ObjectStore for DownStore {
        fn describe(&self) -> String {
            "down".into()
        }

        fn put<'a>(&'a self, key: &'a str, _body: Vec<u8>) -> BoxFuture<'a, Result<(), StorageError>> {
            Box::pin(async move {
                Err(StorageError::HttpStatus {
                    status: 503,
                    url: format!("http://down/{key}"),
                })
            })
        }

        fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, StorageError>> {
            Box::pin(async { Ok(None) })
        }
    }

    fn history_with_down_remote(path: &std::path::Path) -> HistoryStore {
        HistoryStore::new(
            path,
            Some(RemoteHistory {
                store: Arc::new(DownStore),
                key: "chat_history/chat_history.json".into(),
            }),
        )
    }

    #[tokio::test]
    async fn end_chat_flushes_and_resets_session() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(
            dir.path().join("chat_history.json"),
            Some(RemoteHistory {
                store: Arc::new(LocalObjectStore::new(bucket.path(), "b").unwrap()),
                key: "chat_history/chat_history.json".into(),
            }),
        );
        let reg = SessionRegistry::new();
        let s = reg.create().await;
        reg.append(s.id, "q1", "a1").await.unwrap();
        reg.append(s.id, "q2", "a2").await.unwrap();

        let out = reg.end_chat(s.id, Some(&store)).await.unwrap();
        assert_eq!(
            out,
            EndChatOutcome {
                flushed: 2,
                discarded: 0,
                mirror_error: None
            }
        );
        assert_eq!(reg.get(s.id).await.unwrap().len(), 0);
        assert_eq!(store.load().await.unwrap().len(), 2);

        // Nothing left to write: the file is untouched.
        let again = reg.end_chat(s.id, Some(&store)).await.unwrap();
        assert_eq!(again.flushed, 0);
        assert_eq!(store.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_flush_keeps_turns_in_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, "garbage").unwrap();
        let store = HistoryStore::new(&path, None);

        let reg = SessionRegistry::new();
        let s = reg.create().await;
        reg.append(s.id, "q", "a").await.unwrap();

        assert!(reg.end_chat(s.id, Some(&store)).await.is_err());
        assert_eq!(reg.get(s.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_upload_reports_local_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        let store = history_with_down_remote(&path);
        let turn = ChatTurn {
            prompt: "q1".into(),
            answer: "a1".into(),
        };

        let err = store.flush(std::slice::from_ref(&turn)).await.unwrap_err();
        assert!(matches!(err, HistoryError::RemoteMirror { committed: 1, .. }));
        assert_eq!(store.load().await.unwrap(), vec![turn]);
    }

    #[tokio::test]
    async fn failed_upload_does_not_duplicate_turns_on_retry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        let store = history_with_down_remote(&path);

        let reg = SessionRegistry::new();
        let s = reg.create().await;
        reg.append(s.id, "q1", "a1").await.unwrap();

        let out = reg.end_chat(s.id, Some(&store)).await.unwrap();
        assert_eq!(out.flushed, 1);
        assert!(out.mirror_error.as_deref().is_some_and(|e| e.contains("503")));
        assert!(reg.get(s.id).await.unwrap().is_empty());

        // Ending again, even with a working store, writes nothing new.
        let local_only = HistoryStore::new(&path, None);
        let again = reg.end_chat(s.id, Some(&local_only)).await.unwrap();
        assert_eq!(again.flushed, 0);
        let turns = local_only.load().await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].prompt, "q1");
    }
}
