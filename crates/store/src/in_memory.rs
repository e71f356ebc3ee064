//! In-memory store backend.
//!
//! Implements the same trait surface as `SqliteStore` without touching disk.
//! Used by gateway tests and anywhere a throwaway store is convenient.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use quillpad_core::actor::ActorContext;
use quillpad_core::error::StoreError;
use quillpad_core::message::{ChatId, Message};
use quillpad_core::store::{ChatStore, Document, DocumentStore, derive_chat_title};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    actors: HashMap<String, String>,
    chats: HashMap<String, ChatRow>,
    messages: HashMap<String, Vec<Message>>,
    documents: HashMap<String, Document>,
}

struct ChatRow {
    actor_id: String,
    title: String,
}

/// A thread-safe in-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Title assigned when the chat was created.
    pub fn chat_title(&self, chat_id: &ChatId) -> Option<String> {
        self.lock().chats.get(&chat_id.0).map(|c| c.title.clone())
    }
}

#[async_trait]
impl ChatStore for InMemoryStore {
    async fn ensure_actor(&self, actor: &ActorContext) -> Result<(), StoreError> {
        self.lock()
            .actors
            .insert(actor.id.clone(), actor.display_name.clone());
        Ok(())
    }

    async fn resolve_or_create_chat(
        &self,
        actor: &ActorContext,
        chat_id: Option<ChatId>,
        first_message: &str,
    ) -> Result<ChatId, StoreError> {
        let mut inner = self.lock();
        match chat_id {
            Some(id) => match inner.chats.get(&id.0) {
                Some(chat) if chat.actor_id == actor.id => Ok(id),
                _ => Err(StoreError::Forbidden(format!("chat {id}"))),
            },
            None => {
                let id = ChatId::new();
                inner.chats.insert(
                    id.0.clone(),
                    ChatRow {
                        actor_id: actor.id.clone(),
                        title: derive_chat_title(first_message),
                    },
                );
                inner.messages.insert(id.0.clone(), Vec::new());
                Ok(id)
            }
        }
    }

    async fn append_message(
        &self,
        chat_id: &ChatId,
        message: &Message,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.chats.contains_key(&chat_id.0) {
            return Err(StoreError::NotFound(format!("chat {chat_id}")));
        }
        inner
            .messages
            .entry(chat_id.0.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn touch_chat(&self, _chat_id: &ChatId) -> Result<(), StoreError> {
        Ok(())
    }

    async fn messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .lock()
            .messages
            .get(&chat_id.0)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create(
        &self,
        actor: &ActorContext,
        title: &str,
        content: &str,
    ) -> Result<Document, StoreError> {
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            actor_id: actor.id.clone(),
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.lock().documents.insert(doc.id.clone(), doc.clone());
        Ok(doc)
    }

    async fn get(&self, actor: &ActorContext, id: &str) -> Result<Document, StoreError> {
        let inner = self.lock();
        let doc = inner
            .documents
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?;
        if doc.actor_id != actor.id {
            return Err(StoreError::Forbidden(format!("document {id}")));
        }
        Ok(doc.clone())
    }

    async fn update(
        &self,
        actor: &ActorContext,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Document, StoreError> {
        let mut inner = self.lock();
        let doc = inner
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?;
        if doc.actor_id != actor.id {
            return Err(StoreError::Forbidden(format!("document {id}")));
        }
        if let Some(title) = title {
            doc.title = title.to_string();
        }
        if let Some(content) = content {
            doc.content = content.to_string();
        }
        doc.updated_at = Utc::now();
        Ok(doc.clone())
    }

    async fn list_by_actor(&self, actor: &ActorContext) -> Result<Vec<Document>, StoreError> {
        let inner = self.lock();
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|d| d.actor_id == actor.id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ActorContext {
        ActorContext::new("alice", "Alice")
    }

    #[tokio::test]
    async fn chat_lifecycle() {
        let store = InMemoryStore::new();
        store.ensure_actor(&alice()).await.unwrap();

        let chat = store.resolve_or_create_chat(&alice(), None, "hello").await.unwrap();
        store
            .append_message(&chat, &Message::user("hi"))
            .await
            .unwrap();

        let messages = store.messages(&chat).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi");
    }

    #[tokio::test]
    async fn new_chat_gets_a_derived_title() {
        let store = InMemoryStore::new();
        store.ensure_actor(&alice()).await.unwrap();

        let chat = store
            .resolve_or_create_chat(&alice(), None, "Plan my garden layout")
            .await
            .unwrap();
        assert_eq!(
            store.chat_title(&chat).as_deref(),
            Some("Plan my garden layout")
        );
    }

    #[tokio::test]
    async fn foreign_chat_refused() {
        let store = InMemoryStore::new();
        let bob = ActorContext::new("bob", "Bob");
        store.ensure_actor(&alice()).await.unwrap();
        store.ensure_actor(&bob).await.unwrap();

        let chat = store.resolve_or_create_chat(&alice(), None, "hello").await.unwrap();
        let err = store
            .resolve_or_create_chat(&bob, Some(chat), "hi again")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn document_ownership_enforced() {
        let store = InMemoryStore::new();
        let bob = ActorContext::new("bob", "Bob");
        let doc = store.create(&alice(), "Notes", "text").await.unwrap();

        let err = store.get(&bob, &doc.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
        assert!(store.list_by_actor(&bob).await.unwrap().is_empty());
    }
}
