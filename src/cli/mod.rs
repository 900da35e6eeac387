use clap::Parser;
use crate::transport::DEFAULT_CHAT_URL;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Assistant Backend Args ---
    /// Endpoint of the assistant chat API (POST {message, history})
    #[arg(long, env = "AI_CHAT_URL", default_value = DEFAULT_CHAT_URL)]
    pub chat_url: String,

    /// Number of most recent messages sent as context with each request
    #[arg(long, env = "CONTEXT_WINDOW", default_value = "10")]
    pub context_window: usize,

    // --- History Store Args ---
    /// History chat store type (file, redis, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "file")]
    pub history_type: String,

    /// Directory for the file history store. Defaults to the platform data directory.
    #[arg(long, env = "HISTORY_DIR")]
    pub history_dir: Option<String>,

    /// History chat store host endpoint (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "HISTORY_HOST", default_value = "redis://127.0.0.1:6379")]
    pub history_host: String,

    /// Prefix for Redis history keys.
    #[arg(long, env = "HISTORY_REDIS_PREFIX", default_value = "history:")]
    pub history_redis_prefix: String,

    /// Key the conversation record is stored under.
    #[arg(long, env = "HISTORY_KEY", default_value = "maung_ai_history")]
    pub history_key: String,

    /// Maximum number of messages kept in the persisted record.
    #[arg(long, env = "HISTORY_LIMIT", default_value = "20")]
    pub history_limit: usize,
}
