//! In-memory conversations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::RwLock,
    time::{Duration, Instant},
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{errors::HistoryError, store::HistoryStore};

/// One question/answer exchange, as stored in the history file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub prompt: String,
    pub answer: String,
}

/// Ordered turns of one conversation.
#[derive(Clone, Debug, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    pub fn append(&mut self, prompt: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn {
            prompt: prompt.into(),
            answer: answer.into(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drains all turns, leaving the session empty.
    pub fn take_turns(&mut self) -> Vec<ChatTurn> {
        std::mem::take(&mut self.turns)
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of ending a chat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EndChatOutcome {
    /// Turns written to the history store.
    pub flushed: usize,
    /// Turns dropped without persisting.
    pub discarded: usize,
    /// Set when the turns reached the local file but not the remote copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mirror_error: Option<String>,
}

/// Sessions untouched for this long are dropped on the next `create`.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug)]
struct Entry {
    session: ChatSession,
    last_active: Instant,
}

/// All live sessions of the process, keyed by id.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_ttl(DEFAULT_IDLE_TTL)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Creates and registers an empty session, dropping idle ones first.
    pub async fn create(&self) -> ChatSession {
        let session = ChatSession::new();
        let mut sessions = self.sessions.write().await;
        let evicted = evict_idle(&mut sessions, self.idle_ttl);
        sessions.insert(
            session.id,
            Entry {
                session: session.clone(),
                last_active: Instant::now(),
            },
        );
        info!(session = %session.id, live = sessions.len(), evicted, "chat session created");
        session
    }

    /// Snapshot of a session.
    pub async fn get(&self, id: Uuid) -> Result<ChatSession, HistoryError> {
        let mut sessions = self.sessions.write().await;
        let entry = touch(&mut sessions, id)?;
        Ok(entry.session.clone())
    }

    /// Appends a turn; returns the new session length.
    pub async fn append(
        &self,
        id: Uuid,
        prompt: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<usize, HistoryError> {
        let mut sessions = self.sessions.write().await;
        let session = &mut touch(&mut sessions, id)?.session;
        session.append(prompt, answer);
        debug!(session = %id, len = session.len(), "turn appended");
        Ok(session.len())
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Ends the conversation: drains the session and, when `store` is given
    /// and there is something to write, flushes the drained turns.
    ///
    /// If nothing reached the history file the turns are put back. Turns
    /// that were written locally stay out of the session even when the
    /// remote copy failed, so a retry cannot duplicate them.
    pub async fn end_chat(
        &self,
        id: Uuid,
        store: Option<&HistoryStore>,
    ) -> Result<EndChatOutcome, HistoryError> {
        let turns = {
            let mut sessions = self.sessions.write().await;
            touch(&mut sessions, id)?.session.take_turns()
        };

        let outcome = match store {
            Some(store) if !turns.is_empty() => match store.flush(&turns).await {
                Ok(_) => EndChatOutcome {
                    flushed: turns.len(),
                    discarded: 0,
                    mirror_error: None,
                },
                Err(HistoryError::RemoteMirror { committed, source }) => EndChatOutcome {
                    flushed: committed,
                    discarded: 0,
                    mirror_error: Some(source.to_string()),
                },
                Err(e) => {
                    self.restore(id, turns).await;
                    return Err(e);
                }
            },
            _ => EndChatOutcome {
                flushed: 0,
                discarded: turns.len(),
                mirror_error: None,
            },
        };

        info!(session = %id, flushed = outcome.flushed, discarded = outcome.discarded, "chat ended");
        Ok(outcome)
    }

    async fn restore(&self, id: Uuid, mut turns: Vec<ChatTurn>) {
        if let Some(entry) = self.sessions.write().await.get_mut(&id) {
            // Turns appended meanwhile go after the restored ones.
            turns.append(&mut entry.session.turns);
            entry.session.turns = turns;
        }
    }
}

fn touch(sessions: &mut HashMap<Uuid, Entry>, id: Uuid) -> Result<&mut Entry, HistoryError> {
    let entry = sessions.get_mut(&id).ok_or(HistoryError::UnknownSession(id))?;
    entry.last_active = Instant::now();
    Ok(entry)
}

fn evict_idle(sessions: &mut HashMap<Uuid, Entry>, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, e| e.last_active.elapsed() <= ttl);
    before - sessions.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_take() {
        let mut s = ChatSession::new();
        s.append("q1", "a1");
        assert_eq!(s.len(), 1);
        s.append("q2", "a2");
        assert_eq!(s.len(), 2);

        let taken = s.take_turns();
        assert_eq!(taken.len(), 2);
        assert!(s.is_empty());
        assert_eq!(taken[0], ChatTurn { prompt: "q1".into(), answer: "a1".into() });
    }

    #[tokio::test]
    async fn registry_tracks_sessions_independently() {
        let reg = SessionRegistry::new();
        let a = reg.create().await;
        let b = reg.create().await;
        assert_ne!(a.id, b.id);

        assert_eq!(reg.append(a.id, "q", "a").await.unwrap(), 1);
        assert_eq!(reg.get(a.id).await.unwrap().len(), 1);
        assert!(reg.get(b.id).await.unwrap().is_empty());

        let unknown = Uuid::new_v4();
        assert!(matches!(
            reg.append(unknown, "q", "a").await,
            Err(HistoryError::UnknownSession(id)) if id == unknown
        ));
    }

    #[tokio::test]
    async fn end_chat_without_store_discards() {
        let reg = SessionRegistry::new();
        let s = reg.create().await;
        reg.append(s.id, "q", "a").await.unwrap();

        let out = reg.end_chat(s.id, None).await.unwrap();
        assert_eq!(
            out,
            EndChatOutcome {
                flushed: 0,
                discarded: 1,
                mirror_error: None
            }
        );
        assert_eq!(reg.get(s.id).await.unwrap().len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted_on_create() {
        let reg = SessionRegistry::with_idle_ttl(Duration::from_secs(60));
        let active = reg.create().await;
        let idle = reg.create().await;

        tokio::time::advance(Duration::from_secs(30)).await;
        reg.append(active.id, "q", "a").await.unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;

        let fresh = reg.create().await;
        assert_eq!(reg.len().await, 2);
        assert!(matches!(
            reg.get(idle.id).await,
            Err(HistoryError::UnknownSession(id)) if id == idle.id
        ));
        assert_eq!(reg.get(active.id).await.unwrap().len(), 1);
        assert!(reg.get(fresh.id).await.unwrap().is_empty());
    }
}
