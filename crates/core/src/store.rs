//! Persistence traits for chats and documents.
//!
//! Implementations live in `quillpad-store`. The traits are async and
//! object-safe so the gateway can hold them behind `Arc<dyn ...>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actor::ActorContext;
use crate::error::StoreError;
use crate::message::{ChatId, Message};

/// A persisted document owned by a single actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub actor_id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chat persistence: actors, chats, and their message transcripts.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Upsert the actor row so foreign keys resolve.
    async fn ensure_actor(&self, actor: &ActorContext) -> Result<(), StoreError>;

    /// Resolve an existing chat or create a new one.
    ///
    /// With `Some(id)`, the chat must exist and belong to `actor`, otherwise
    /// `StoreError::Forbidden`. With `None`, a fresh chat is created with a
    /// title derived from `first_message` and its id returned.
    async fn resolve_or_create_chat(
        &self,
        actor: &ActorContext,
        chat_id: Option<ChatId>,
        first_message: &str,
    ) -> Result<ChatId, StoreError>;

    /// Append one message to a chat's transcript.
    async fn append_message(&self, chat_id: &ChatId, message: &Message)
        -> Result<(), StoreError>;

    /// Bump the chat's updated-at timestamp.
    async fn touch_chat(&self, chat_id: &ChatId) -> Result<(), StoreError>;

    /// Load a chat's transcript in insertion order.
    async fn messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError>;
}

/// Derive a chat title from its first user message.
///
/// Truncation happens on a char boundary; longer messages get an ellipsis.
pub fn derive_chat_title(first_message: &str) -> String {
    const MAX_CHARS: usize = 60;

    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return "New chat".to_string();
    }

    let mut title: String = trimmed.chars().take(MAX_CHARS).collect();
    if trimmed.chars().count() > MAX_CHARS {
        title.push('…');
    }
    title
}

/// Document persistence. Every operation is scoped to the acting user;
/// reaching another actor's document is `StoreError::Forbidden`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(
        &self,
        actor: &ActorContext,
        title: &str,
        content: &str,
    ) -> Result<Document, StoreError>;

    async fn get(&self, actor: &ActorContext, id: &str) -> Result<Document, StoreError>;

    async fn update(
        &self,
        actor: &ActorContext,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Document, StoreError>;

    async fn list_by_actor(&self, actor: &ActorContext) -> Result<Vec<Document>, StoreError>;
}
