// src/conversation.rs — Live multi-turn exchange with the model
//
// A Conversation is the in-memory half of a chat session: the seed pair
// (instruction + codebase, canned acknowledgment) followed by every completed
// turn. It is never persisted; losing it means re-ingesting.

use std::sync::Arc;

use crate::core::types::MessageRole;
use crate::infra::errors::RepoChatError;
use crate::provider::{ChatRequest, Message, ModelProvider};

pub const SEED_ACKNOWLEDGMENT: &str =
    "Understood. I have analyzed the codebase. Ask me anything about it.";

/// The opening user turn that carries the whole artifact.
pub fn seed_prompt(context: &str) -> String {
    format!(
        "\nYou are an expert software engineer acting as an 'Onboarding Buddy'.\n\
         You have been provided with the entire source code of a repository below.\n\
         Your goal is to answer questions about the codebase, architecture, and implementation details.\n\
         Be concise, specific, and cite file names where possible.\n\
         \n\
         CODEBASE CONTEXT:\n\
         {context}\n"
    )
}

/// Generation settings applied to every turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationOptions {
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

pub struct Conversation {
    provider: Arc<dyn ModelProvider>,
    options: ConversationOptions,
    history: Vec<Message>,
}

impl Conversation {
    /// Open a conversation seeded with `context`. Prior turns, if any, are
    /// appended after the seed pair rather than replacing it.
    pub fn open(
        provider: Arc<dyn ModelProvider>,
        options: ConversationOptions,
        context: &str,
        prior: &[(MessageRole, String)],
    ) -> Self {
        let mut history = Vec::with_capacity(2 + prior.len());
        history.push(Message::user(seed_prompt(context)));
        history.push(Message::assistant(SEED_ACKNOWLEDGMENT));
        history.extend(
            prior
                .iter()
                .map(|(role, text)| Message::from_history(*role, text.clone())),
        );

        Self {
            provider,
            options,
            history,
        }
    }

    /// Send one user message and return the reply. The turn is only recorded
    /// once the model answers; on error the history is untouched and the
    /// error is returned as-is (no retry).
    pub async fn send(&mut self, message: &str) -> Result<String, RepoChatError> {
        let mut messages = self.history.clone();
        messages.push(Message::user(message));

        let request = ChatRequest {
            model: self.options.model.clone(),
            messages,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        tracing::debug!(
            provider = self.provider.name(),
            turns = self.turns(),
            "Sending message"
        );
        let response = self.provider.chat(request).await?;

        self.history.push(Message::user(message));
        self.history.push(Message::assistant(response.content.clone()));
        Ok(response.content)
    }

    /// Number of completed exchanges, not counting the seed pair.
    pub fn turns(&self) -> usize {
        (self.history.len() - 2) / 2
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }
}
