mod file;
mod memory;
mod redis;

pub use self::file::FileStorage;
pub use self::memory::MemoryStorage;
pub use self::redis::RedisStorage;

use async_trait::async_trait;
use log::{ info, warn };
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use crate::cli::Args;
use crate::error::StorageError;
use crate::models::chat::ChatMessage;

pub const DEFAULT_HISTORY_KEY: &str = "maung_ai_history";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// String-keyed durable storage. Last write wins; a missing key reads as `None`.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Bounded mirror of a conversation log kept under a single storage key.
#[derive(Clone)]
pub struct HistoryStore {
    storage: Arc<dyn Storage>,
    key: String,
    limit: usize,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>, limit: usize) -> Self {
        Self {
            storage,
            key: key.into(),
            limit,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), DEFAULT_HISTORY_KEY, DEFAULT_HISTORY_LIMIT)
    }

    /// Replaces the stored record with the most recent `limit` messages of `log`.
    pub async fn save(&self, log: &[ChatMessage]) -> Result<(), StorageError> {
        let start = log.len().saturating_sub(self.limit);
        let record = serde_json::to_string(&log[start..])?;
        self.storage.set(&self.key, &record).await
    }

    /// Returns the stored record, or an empty log when there is none or it
    /// cannot be read.
    pub async fn load(&self) -> Vec<ChatMessage> {
        let raw = match self.storage.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                return Vec::new();
            }
            Err(e) => {
                warn!("History storage unavailable, starting empty: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Discarding corrupted history record '{}': {}", self.key, e);
                Vec::new()
            }
        }
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(&self.key).await
    }
}

pub fn create_storage(args: &Args) -> Result<Arc<dyn Storage>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "file" => {
            let dir = match &args.history_dir {
                Some(dir) => PathBuf::from(dir),
                None =>
                    FileStorage::default_dir().ok_or(
                        "No platform data directory available; set --history-dir"
                    )?,
            };
            Ok(Arc::new(FileStorage::new(dir)))
        }
        "redis" => {
            let store = RedisStorage::new(&args.history_host, &args.history_redis_prefix)?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub fn initialize_history_store(
    args: &Args
) -> Result<HistoryStore, Box<dyn Error + Send + Sync>> {
    info!("Chat history will be stored in: {} under key '{}'", args.history_type, args.history_key);
    let storage = create_storage(args)?;
    Ok(HistoryStore::new(storage, args.history_key.clone(), args.history_limit))
}
