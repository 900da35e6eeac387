mod http;

pub use self::http::HttpTransport;

use async_trait::async_trait;
use crate::error::TransportError;
use crate::models::transport::{ AiChatRequest, AiChatResponse };

pub const DEFAULT_CHAT_URL: &str = "http://127.0.0.1:8080/ai/chat";

/// Request/response channel to the backend AI service.
///
/// `Err` means no usable response arrived (network failure, HTTP error status,
/// undecodable body). An application-level failure is `Ok` with
/// `success == false`.
#[async_trait]
pub trait AiTransport: Send + Sync {
    async fn chat(&self, request: &AiChatRequest) -> Result<AiChatResponse, TransportError>;
}
