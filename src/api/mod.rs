use serde::{Deserialize, Serialize};

use crate::core::conversation::Turn;

/// Request body shared by the streaming, legacy, and title endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub user_input: String,
    pub chat_history: Vec<Turn>,
    pub chat_model: String,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

/// Envelope carried by each server-sent event on the streaming endpoint.
///
/// `data` holds one incremental text fragment; the terminal event arrives
/// with `is_final: true` and an empty fragment.
#[derive(Debug, Deserialize)]
pub struct ChatEvent {
    pub event: String,
    pub data: String,
    pub is_final: bool,
    #[serde(default)]
    pub chat_id: Option<String>,
}

/// Body of the legacy non-streaming chat endpoint and the title endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

pub mod title;
