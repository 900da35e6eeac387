pub mod cli;
pub mod controller;
pub mod error;
pub mod history;
pub mod models;
pub mod render;
pub mod session;
pub mod terminal;
pub mod transport;

use cli::Args;
use controller::{ SessionConfig, SessionController };
use history::initialize_history_store;
use log::info;
use session::ChatSession;
use std::error::Error;
use std::sync::Arc;
use transport::HttpTransport;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Assistant Configuration ---");
    info!("Chat URL: {}", args.chat_url);
    info!("Context Window: {}", args.context_window);
    info!("History Store Type: {}", args.history_type);
    if args.history_type.eq_ignore_ascii_case("redis") {
        info!("History Store Host: {}", args.history_host);
    }
    info!("History Key: {}", args.history_key);
    info!("History Limit: {}", args.history_limit);
    info!("-------------------------------");

    let history = initialize_history_store(&args)?;
    let session = ChatSession::open(history).await;
    let transport = Arc::new(HttpTransport::new(&args.chat_url)?);
    let config = SessionConfig {
        context_window: args.context_window,
    };
    let controller = Arc::new(SessionController::new(session, transport, config));

    terminal::run_repl(controller).await
}
