use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{ broadcast, Mutex, Notify };

use maung_assistant::controller::{
    SendOutcome,
    SessionConfig,
    SessionController,
    SessionEvent,
    GENERIC_ERROR,
};
use maung_assistant::error::{ StorageError, TransportError };
use maung_assistant::history::{ HistoryStore, MemoryStorage, Storage };
use maung_assistant::models::chat::{ ChatMessage, Role };
use maung_assistant::models::content::ContentBlock;
use maung_assistant::models::transport::{ AiChatRequest, AiChatResponse };
use maung_assistant::session::ChatSession;
use maung_assistant::transport::AiTransport;

/// Replays queued outcomes and records every request it receives.
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<AiChatResponse, TransportError>>>,
    requests: Mutex<Vec<AiChatRequest>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    fn replying(replies: Vec<Result<AiChatResponse, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    fn gated(reply: AiChatResponse, gate: Arc<Notify>) -> Self {
        Self {
            replies: Mutex::new(vec![Ok(reply)].into()),
            requests: Mutex::default(),
            gate: Some(gate),
        }
    }

    async fn requests(&self) -> Vec<AiChatRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl AiTransport for ScriptedTransport {
    async fn chat(&self, request: &AiChatRequest) -> Result<AiChatResponse, TransportError> {
        self.requests.lock().await.push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock().await
            .pop_front()
            .unwrap_or_else(|| Ok(AiChatResponse::reply("ok")))
    }
}

/// Counts writes so tests can tell whether a save happened.
#[derive(Default)]
struct CountingStorage {
    inner: MemoryStorage,
    writes: Mutex<usize>,
    fail_writes: bool,
}

#[async_trait]
impl Storage for CountingStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        *self.writes.lock().await += 1;
        if self.fail_writes {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

async fn controller_with(
    transport: Arc<ScriptedTransport>,
    storage: Arc<CountingStorage>
) -> (SessionController, HistoryStore) {
    let history = HistoryStore::new(storage, "maung_ai_history", 20);
    let session = ChatSession::open(history.clone()).await;
    (SessionController::new(session, transport, SessionConfig::default()), history)
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn hello_round_trip_renders_and_persists() {
    let transport = Arc::new(ScriptedTransport::replying(vec![Ok(AiChatResponse::reply("**hi** there"))]));
    let storage = Arc::new(CountingStorage::default());
    let (controller, history) = controller_with(transport.clone(), storage).await;
    let mut events = controller.subscribe();

    let outcome = controller.send("hello").await;

    assert_eq!(outcome, SendOutcome::Replied { saved: true });
    let expected = vec![ChatMessage::user("hello"), ChatMessage::assistant("**hi** there")];
    assert_eq!(controller.messages().await, expected);
    assert_eq!(history.load().await, expected);
    assert!(!controller.is_busy().await);

    assert_eq!(drain(&mut events), vec![
        SessionEvent::TypingStarted,
        SessionEvent::MessageAdded {
            message: ChatMessage::assistant("**hi** there"),
            blocks: vec![ContentBlock::emphasis("hi"), ContentBlock::text(" there")],
        },
        SessionEvent::TypingStopped
    ]);

    let requests = transport.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message, "hello");
    assert_eq!(requests[0].history, vec![ChatMessage::user("hello")]);
}

#[tokio::test]
async fn blank_input_is_a_silent_no_op() {
    let transport = Arc::new(ScriptedTransport::default());
    let storage = Arc::new(CountingStorage::default());
    let (controller, _) = controller_with(transport.clone(), storage.clone()).await;
    let mut events = controller.subscribe();

    assert_eq!(controller.send("").await, SendOutcome::Ignored);
    assert_eq!(controller.send("   \n\t").await, SendOutcome::Ignored);

    assert!(controller.messages().await.is_empty());
    assert!(!controller.is_busy().await);
    assert!(drain(&mut events).is_empty());
    assert!(transport.requests().await.is_empty());
    assert_eq!(*storage.writes.lock().await, 0);
}

#[tokio::test]
async fn input_is_trimmed_before_sending() {
    let transport = Arc::new(ScriptedTransport::default());
    let (controller, _) = controller_with(transport.clone(), Arc::default()).await;

    controller.send("  TINGALI siswa \n").await;

    assert_eq!(transport.requests().await[0].message, "TINGALI siswa");
    assert_eq!(controller.messages().await[0], ChatMessage::user("TINGALI siswa"));
}

#[tokio::test]
async fn second_send_while_in_flight_is_dropped() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(ScriptedTransport::gated(AiChatResponse::reply("done"), gate.clone()));
    let (controller, _) = controller_with(transport.clone(), Arc::default()).await;
    let controller = Arc::new(controller);

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.send("first").await }
    });
    while !controller.is_busy().await {
        tokio::task::yield_now().await;
    }

    assert_eq!(controller.send("second").await, SendOutcome::Ignored);
    assert_eq!(controller.messages().await, vec![ChatMessage::user("first")]);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), SendOutcome::Replied { saved: true });

    assert_eq!(transport.requests().await.len(), 1);
    assert_eq!(controller.messages().await, vec![
        ChatMessage::user("first"),
        ChatMessage::assistant("done")
    ]);
    assert!(!controller.is_busy().await);
}

#[tokio::test]
async fn context_window_carries_ten_most_recent_messages() {
    let transport = Arc::new(ScriptedTransport::default());
    let (controller, _) = controller_with(transport.clone(), Arc::default()).await;

    for i in 0..6 {
        controller.send(&format!("q{}", i)).await;
    }

    let requests = transport.requests().await;
    let last = &requests[5];
    assert_eq!(last.history.len(), 10);
    // 12 messages in the log at this point; the oldest two are left out.
    let log = controller.messages().await;
    assert_eq!(last.history, log[1..11].to_vec());
    assert_eq!(last.history.last(), Some(&ChatMessage::user("q5")));
    assert_eq!(last.history[0], ChatMessage::assistant("ok"));
    assert_eq!(last.history[1], ChatMessage::user("q1"));
}

#[tokio::test]
async fn persisted_history_is_capped_at_twenty() {
    let transport = Arc::new(ScriptedTransport::default());
    let (controller, history) = controller_with(transport, Arc::default()).await;

    for i in 0..15 {
        controller.send(&format!("q{}", i)).await;
    }

    let log = controller.messages().await;
    assert_eq!(log.len(), 30);
    let persisted = history.load().await;
    assert_eq!(persisted.len(), 20);
    assert_eq!(persisted, log[10..].to_vec());
}

#[tokio::test]
async fn application_error_keeps_only_user_message() {
    let transport = Arc::new(
        ScriptedTransport::replying(
            vec![Ok(AiChatResponse::reply("first reply")), Ok(AiChatResponse::failure("x"))]
        )
    );
    let storage = Arc::new(CountingStorage::default());
    let (controller, history) = controller_with(transport, storage.clone()).await;

    controller.send("one").await;
    let before = controller.messages().await;
    let mut events = controller.subscribe();

    assert_eq!(controller.send("two").await, SendOutcome::Failed);

    let mut expected = before.clone();
    expected.push(ChatMessage::user("two"));
    assert_eq!(controller.messages().await, expected);
    assert_eq!(*storage.writes.lock().await, 1);
    assert_eq!(history.load().await, before);
    assert_eq!(drain(&mut events), vec![
        SessionEvent::TypingStarted,
        SessionEvent::Error("x".to_string()),
        SessionEvent::TypingStopped
    ]);
}

#[tokio::test]
async fn application_error_without_text_uses_generic_message() {
    let failure = AiChatResponse {
        success: false,
        reply: None,
        error: Some(String::new()),
    };
    let transport = Arc::new(ScriptedTransport::replying(vec![Ok(failure)]));
    let (controller, _) = controller_with(transport, Arc::default()).await;
    let mut events = controller.subscribe();

    controller.send("hello").await;

    assert!(drain(&mut events).contains(&SessionEvent::Error(GENERIC_ERROR.to_string())));
}

#[tokio::test]
async fn transport_failure_reports_connection_error() {
    let transport = Arc::new(
        ScriptedTransport::replying(vec![Err(TransportError::Decode("unexpected end of input".into()))])
    );
    let storage = Arc::new(CountingStorage::default());
    let (controller, _) = controller_with(transport, storage.clone()).await;
    let mut events = controller.subscribe();

    assert_eq!(controller.send("hello").await, SendOutcome::Failed);

    assert_eq!(controller.messages().await, vec![ChatMessage::user("hello")]);
    assert!(!controller.is_busy().await);
    assert_eq!(*storage.writes.lock().await, 0);
    let seen = drain(&mut events);
    assert!(
        matches!(&seen[1], SessionEvent::Error(text) if text.starts_with("Connection error: ")),
        "unexpected events: {:?}",
        seen
    );
    assert_eq!(seen.last(), Some(&SessionEvent::TypingStopped));

    // The session is usable again after a failure.
    assert_eq!(controller.send("again").await, SendOutcome::Replied { saved: true });
}

#[tokio::test]
async fn failed_save_is_reported_but_reply_is_kept() {
    let transport = Arc::new(ScriptedTransport::default());
    let storage = Arc::new(CountingStorage {
        fail_writes: true,
        ..Default::default()
    });
    let (controller, _) = controller_with(transport, storage).await;
    let mut events = controller.subscribe();

    assert_eq!(controller.send("hello").await, SendOutcome::Replied { saved: false });
    assert_eq!(controller.messages().await.len(), 2);
    assert!(
        !drain(&mut events)
            .iter()
            .any(|e| matches!(e, SessionEvent::Error(_)))
    );
}

#[tokio::test]
async fn empty_assistant_reply_is_appended() {
    let transport = Arc::new(ScriptedTransport::replying(vec![Ok(AiChatResponse::reply(""))]));
    let (controller, _) = controller_with(transport, Arc::default()).await;

    assert_eq!(controller.send("hello").await, SendOutcome::Replied { saved: true });
    assert_eq!(controller.messages().await[1], ChatMessage::new(Role::Assistant, ""));
}

#[tokio::test]
async fn new_chat_clears_log_and_history() {
    let transport = Arc::new(ScriptedTransport::default());
    let (controller, history) = controller_with(transport, Arc::default()).await;
    controller.send("hello").await;
    let mut events = controller.subscribe();

    controller.new_chat().await;

    assert!(controller.messages().await.is_empty());
    assert!(history.load().await.is_empty());
    assert_eq!(drain(&mut events), vec![SessionEvent::SessionReset]);
}

#[tokio::test]
async fn reset_during_request_keeps_busy_and_takes_late_reply() {
    let gate = Arc::new(Notify::new());
    let transport = Arc::new(ScriptedTransport::gated(AiChatResponse::reply("late"), gate.clone()));
    let (controller, history) = controller_with(transport, Arc::default()).await;
    let controller = Arc::new(controller);
    let mut events = controller.subscribe();

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.send("hi").await }
    });
    while !controller.is_busy().await {
        tokio::task::yield_now().await;
    }

    controller.new_chat().await;
    assert!(controller.is_busy().await);
    assert!(controller.messages().await.is_empty());

    gate.notify_one();
    assert_eq!(pending.await.unwrap(), SendOutcome::Replied { saved: true });

    assert_eq!(controller.messages().await, vec![ChatMessage::assistant("late")]);
    assert_eq!(history.load().await, vec![ChatMessage::assistant("late")]);
    assert!(!controller.is_busy().await);
    assert_eq!(drain(&mut events), vec![
        SessionEvent::TypingStarted,
        SessionEvent::SessionReset,
        SessionEvent::MessageAdded {
            message: ChatMessage::assistant("late"),
            blocks: vec![ContentBlock::text("late")],
        },
        SessionEvent::TypingStopped
    ]);
}

#[tokio::test]
async fn session_resumes_from_saved_history() {
    let storage = Arc::new(CountingStorage::default());
    let transport = Arc::new(ScriptedTransport::default());
    let (controller, _) = controller_with(transport.clone(), storage.clone()).await;
    controller.send("hello").await;
    drop(controller);

    let (resumed, _) = controller_with(transport.clone(), storage).await;
    assert_eq!(resumed.messages().await, vec![ChatMessage::user("hello"), ChatMessage::assistant("ok")]);

    resumed.send("next").await;
    let requests = transport.requests().await;
    assert_eq!(requests[1].history.len(), 3);
}

#[tokio::test]
async fn ask_sends_suggested_question() {
    let transport = Arc::new(ScriptedTransport::default());
    let (controller, _) = controller_with(transport.clone(), Arc::default()).await;

    assert_eq!(controller.ask(2).await, SendOutcome::Replied { saved: true });
    assert_eq!(controller.ask(7).await, SendOutcome::Ignored);
    assert_eq!(transport.requests().await[0].message, "Jelaskeun syntax TINGALI");
}
