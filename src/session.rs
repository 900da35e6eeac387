use log::info;
use crate::error::SessionError;
use crate::history::HistoryStore;
use crate::models::chat::{ ChatMessage, Role };

/// Live conversation: the ordered message log plus the in-flight flag.
///
/// Access is expected to be single-threaded; the busy flag is the only
/// admission control and callers check it before starting a request.
pub struct ChatSession {
    log: Vec<ChatMessage>,
    busy: bool,
    history: HistoryStore,
}

impl ChatSession {
    /// Creates a session seeded from `history`.
    pub async fn open(history: HistoryStore) -> Self {
        let log = history.load().await;
        if !log.is_empty() {
            info!("Restored {} messages from chat history", log.len());
        }
        Self {
            log,
            busy: false,
            history,
        }
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Result<&ChatMessage, SessionError> {
        let content = content.into();
        if role == Role::User && content.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        self.log.push(ChatMessage::new(role, content));
        Ok(&self.log[self.log.len() - 1])
    }

    /// Appends an assistant reply. Replies may be empty.
    pub fn push_reply(&mut self, content: impl Into<String>) -> &ChatMessage {
        self.log.push(ChatMessage::assistant(content));
        &self.log[self.log.len() - 1]
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.log
    }

    pub fn last_n(&self, n: usize) -> &[ChatMessage] {
        &self.log[self.log.len().saturating_sub(n)..]
    }

    pub async fn save(&self) -> Result<(), SessionError> {
        self.history.save(&self.log).await?;
        Ok(())
    }

    /// Empties the log and deletes the persisted record. `busy` is untouched.
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        self.log.clear();
        self.history.clear().await?;
        Ok(())
    }
}
