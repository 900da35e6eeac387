use log::{ debug, error, info, warn };
use std::sync::Arc;
use tokio::sync::{ broadcast, Mutex };

use crate::models::chat::{ ChatMessage, Role };
use crate::models::content::ContentBlock;
use crate::models::transport::AiChatRequest;
use crate::render::render;
use crate::session::ChatSession;
use crate::transport::AiTransport;

pub const DEFAULT_CONTEXT_WINDOW: usize = 10;
pub const GENERIC_ERROR: &str = "Something went wrong";

const EVENT_CAPACITY: usize = 64;

pub const SUGGESTED_QUESTIONS: [&str; 3] = [
    "Kumaha carana ngadamel tabel?",
    "Bikeun conto insert data",
    "Jelaskeun syntax TINGALI",
];

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Number of most recent messages sent along with each request.
    pub context_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TypingStarted,
    TypingStopped,
    MessageAdded {
        message: ChatMessage,
        blocks: Vec<ContentBlock>,
    },
    Error(String),
    SessionReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input, or a request was already in flight.
    Ignored,
    /// The assistant replied. `saved` is false when persisting the log failed.
    Replied {
        saved: bool,
    },
    /// An error event was emitted; the log only gained the user message.
    Failed,
}

pub struct SessionController {
    session: Mutex<ChatSession>,
    transport: Arc<dyn AiTransport>,
    events: broadcast::Sender<SessionEvent>,
    config: SessionConfig,
}

impl SessionController {
    pub fn new(session: ChatSession, transport: Arc<dyn AiTransport>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session: Mutex::new(session),
            transport,
            events,
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.session.lock().await.messages().to_vec()
    }

    pub async fn is_busy(&self) -> bool {
        self.session.lock().await.is_busy()
    }

    /// Sends one user message and waits for the assistant's reply.
    ///
    /// Never fails: every outcome is reported through events. Calls made while
    /// a request is in flight are dropped, not queued.
    pub async fn send(&self, raw_input: &str) -> SendOutcome {
        let message = raw_input.trim();
        if message.is_empty() {
            return SendOutcome::Ignored;
        }

        // The lock is released before the transport call so a concurrent
        // send observes the busy flag instead of waiting.
        let request = {
            let mut session = self.session.lock().await;
            if session.is_busy() {
                debug!("Dropping message while a request is in flight");
                return SendOutcome::Ignored;
            }
            if let Err(e) = session.append(Role::User, message) {
                debug!("Rejected user message: {}", e);
                return SendOutcome::Ignored;
            }
            session.set_busy(true);
            AiChatRequest {
                message: message.to_string(),
                history: session.last_n(self.config.context_window).to_vec(),
            }
        };
        self.emit(SessionEvent::TypingStarted);

        let result = self.transport.chat(&request).await;

        let mut session = self.session.lock().await;
        let outcome = match result {
            Ok(resp) if resp.success => {
                let reply = resp.reply.unwrap_or_default();
                let blocks = render(&reply);
                let added = session.push_reply(reply).clone();
                let saved = match session.save().await {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Failed to save chat history: {}", e);
                        false
                    }
                };
                self.emit(SessionEvent::MessageAdded { message: added, blocks });
                SendOutcome::Replied { saved }
            }
            Ok(resp) => {
                let text = resp.error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| GENERIC_ERROR.to_string());
                warn!("Assistant backend reported an error: {}", text);
                self.emit(SessionEvent::Error(text));
                SendOutcome::Failed
            }
            Err(e) => {
                warn!("Assistant transport failed: {}", e);
                self.emit(SessionEvent::Error(format!("Connection error: {}", e)));
                SendOutcome::Failed
            }
        };

        session.set_busy(false);
        self.emit(SessionEvent::TypingStopped);
        outcome
    }

    /// Sends the suggested starter question at `index`.
    pub async fn ask(&self, index: usize) -> SendOutcome {
        match SUGGESTED_QUESTIONS.get(index) {
            Some(question) => self.send(question).await,
            None => SendOutcome::Ignored,
        }
    }

    /// Starts a new chat: empties the log and removes the persisted record.
    pub async fn new_chat(&self) {
        let mut session = self.session.lock().await;
        if let Err(e) = session.clear().await {
            error!("Failed to remove chat history: {}", e);
        }
        info!("Chat session reset");
        self.emit(SessionEvent::SessionReset);
    }

    fn emit(&self, event: SessionEvent) {
        // Only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }
}
