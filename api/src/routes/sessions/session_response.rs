use chat_history::{ChatSession, ChatTurn};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Session as shown to the page: id plus turns in order.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<ChatTurn>,
}

impl From<ChatSession> for SessionView {
    fn from(s: ChatSession) -> Self {
        Self {
            id: s.id,
            created_at: s.created_at,
            turns: s.turns().to_vec(),
        }
    }
}
