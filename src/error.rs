use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("redis storage error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("history record JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("invalid endpoint '{0}'")]
    Endpoint(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    Storage(#[from] StorageError),
}
