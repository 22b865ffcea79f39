//! Upstream chat-completion providers.
//!
//! The relay endpoint talks to the provider through [`ChatProvider`] so the
//! routing layer can be exercised without network access.

pub mod openrouter;

use apa_core::{CancellationSignal, RelayError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openrouter::OpenRouterProvider;

/// Author of a provider-side message; unlike [`Role`] it includes `system`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderRole {
    System,
    User,
    Assistant,
}

impl From<Role> for ProviderRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => ProviderRole::User,
            Role::Assistant => ProviderRole::Assistant,
        }
    }
}

/// One entry of the `messages` array sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ProviderRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ProviderRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run one non-streaming completion over `messages`.
    ///
    /// `Ok(None)` means the provider answered successfully but without any
    /// choice content.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Option<String>, RelayError>;
}
