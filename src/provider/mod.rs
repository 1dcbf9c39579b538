// src/provider/mod.rs — Model provider layer

pub mod google;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::types::MessageRole;
use crate::infra::errors::RepoChatError;

/// Core trait that all model providers implement.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, RepoChatError>;
}

/// Builds a provider for a caller-supplied API key.
///
/// Keys are handed in per ingest and never stored, so providers are created
/// on demand rather than once at startup.
pub trait Connector: Send + Sync {
    fn connect(&self, api_key: &str) -> Arc<dyn ModelProvider>;
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Convert a persisted chat turn back into a provider message.
    pub fn from_history(role: MessageRole, content: impl Into<String>) -> Self {
        match role {
            MessageRole::User => Self::user(content),
            MessageRole::Model => Self::assistant(content),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cache_read_tokens: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Safety,
    #[default]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_user() {
        let m = Message::user("Hello");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.content, "Hello");
    }

    #[test]
    fn test_message_from_history() {
        assert_eq!(
            Message::from_history(MessageRole::Model, "hi").role,
            Role::Assistant
        );
        assert_eq!(Message::from_history(MessageRole::User, "q").role, Role::User);
    }

    #[test]
    fn test_stop_reason_default() {
        assert_eq!(StopReason::default(), StopReason::Unknown);
    }
}
