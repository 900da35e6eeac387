use serde::{ Serialize, Deserialize };
use super::chat::ChatMessage;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AiChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AiChatResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiChatResponse {
    pub fn reply(reply: impl Into<String>) -> Self {
        Self {
            success: true,
            reply: Some(reply.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            reply: None,
            error: Some(error.into()),
        }
    }
}
