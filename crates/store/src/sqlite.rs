//! SQLite persistence backend.
//!
//! A single database file holds four tables:
//! - `actors` — authenticated users
//! - `chats` — one row per conversation, owned by an actor
//! - `messages` — chat transcripts, ordered by insertion rowid
//! - `documents` — actor-owned documents the assistant manages
//!
//! Every document query checks `actor_id`; a document owned by another actor
//! is `StoreError::Forbidden`. Foreign and missing chats both resolve to
//! `Forbidden` so callers cannot probe which chat ids exist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quillpad_core::actor::ActorContext;
use quillpad_core::error::StoreError;
use quillpad_core::message::{ChatId, Message, MessageToolCall, Role};
use quillpad_core::store::{ChatStore, Document, DocumentStore, derive_chat_title};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

/// The production SQLite store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store from a file path.
    ///
    /// The database and all tables are created automatically.
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Title assigned when the chat was created.
    pub async fn chat_title(&self, chat_id: &ChatId) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT title FROM chats WHERE id = ?1")
            .bind(&chat_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("chat title: {e}")))?;
        Ok(row.map(|r| r.get("title")))
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actors (
                id            TEXT PRIMARY KEY,
                display_name  TEXT NOT NULL,
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("actors table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id          TEXT PRIMARY KEY,
                actor_id    TEXT NOT NULL REFERENCES actors(id),
                title       TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("chats table: {e}")))?;

        // iid preserves insertion order for transcript reads
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                iid           INTEGER PRIMARY KEY AUTOINCREMENT,
                id            TEXT UNIQUE NOT NULL,
                chat_id       TEXT NOT NULL REFERENCES chats(id),
                role          TEXT NOT NULL,
                content       TEXT NOT NULL,
                tool_calls    TEXT NOT NULL DEFAULT '[]',
                tool_call_id  TEXT,
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("messages index: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id          TEXT PRIMARY KEY,
                actor_id    TEXT NOT NULL REFERENCES actors(id),
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("documents table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_actor_id ON documents(actor_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("documents index: {e}")))?;

        Ok(())
    }
}

fn role_to_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn role_from_str(s: &str) -> Result<Role, StoreError> {
    match s {
        "system" => Ok(Role::System),
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        "tool" => Ok(Role::Tool),
        other => Err(StoreError::QueryFailed(format!("unknown role: {other}"))),
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn ensure_actor(&self, actor: &ActorContext) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO actors (id, display_name, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name
            "#,
        )
        .bind(&actor.id)
        .bind(&actor.display_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("ensure actor: {e}")))?;
        Ok(())
    }

    async fn resolve_or_create_chat(
        &self,
        actor: &ActorContext,
        chat_id: Option<ChatId>,
        first_message: &str,
    ) -> Result<ChatId, StoreError> {
        match chat_id {
            Some(id) => {
                let row = sqlx::query("SELECT actor_id FROM chats WHERE id = ?1")
                    .bind(&id.0)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::QueryFailed(format!("resolve chat: {e}")))?;

                // A missing chat and a foreign chat look the same to the
                // caller; both refuse access
                match row {
                    Some(row) if row.get::<String, _>("actor_id") == actor.id => Ok(id),
                    _ => Err(StoreError::Forbidden(format!("chat {id}"))),
                }
            }
            None => {
                let id = ChatId::new();
                let now = Utc::now().to_rfc3339();
                sqlx::query(
                    "INSERT INTO chats (id, actor_id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                )
                .bind(&id.0)
                .bind(&actor.id)
                .bind(derive_chat_title(first_message))
                .bind(&now)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::QueryFailed(format!("create chat: {e}")))?;
                Ok(id)
            }
        }
    }

    async fn append_message(
        &self,
        chat_id: &ChatId,
        message: &Message,
    ) -> Result<(), StoreError> {
        let tool_calls = serde_json::to_string(&message.tool_calls)
            .map_err(|e| StoreError::QueryFailed(format!("serialize tool calls: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, role, content, tool_calls, tool_call_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&message.id)
        .bind(&chat_id.0)
        .bind(role_to_str(message.role))
        .bind(&message.content)
        .bind(tool_calls)
        .bind(&message.tool_call_id)
        .bind(message.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("append message: {e}")))?;
        Ok(())
    }

    async fn touch_chat(&self, chat_id: &ChatId) -> Result<(), StoreError> {
        sqlx::query("UPDATE chats SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now().to_rfc3339())
            .bind(&chat_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("touch chat: {e}")))?;
        Ok(())
    }

    async fn messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, role, content, tool_calls, tool_call_id, created_at
            FROM messages WHERE chat_id = ?1 ORDER BY iid ASC
            "#,
        )
        .bind(&chat_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("load messages: {e}")))?;

        rows.into_iter()
            .map(|row| {
                let tool_calls: Vec<MessageToolCall> =
                    serde_json::from_str(&row.get::<String, _>("tool_calls"))
                        .unwrap_or_default();
                Ok(Message {
                    id: row.get("id"),
                    role: role_from_str(&row.get::<String, _>("role"))?,
                    content: row.get("content"),
                    tool_calls,
                    tool_call_id: row.get("tool_call_id"),
                    timestamp: parse_timestamp(&row.get::<String, _>("created_at")),
                })
            })
            .collect()
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
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

        sqlx::query(
            r#"
            INSERT INTO documents (id, actor_id, title, content, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.actor_id)
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("create document: {e}")))?;

        Ok(doc)
    }

    async fn get(&self, actor: &ActorContext, id: &str) -> Result<Document, StoreError> {
        let row = sqlx::query(
            "SELECT id, actor_id, title, content, created_at, updated_at FROM documents WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("get document: {e}")))?
        .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?;

        let owner: String = row.get("actor_id");
        if owner != actor.id {
            return Err(StoreError::Forbidden(format!("document {id}")));
        }

        Ok(Document {
            id: row.get("id"),
            actor_id: owner,
            title: row.get("title"),
            content: row.get("content"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at")),
            updated_at: parse_timestamp(&row.get::<String, _>("updated_at")),
        })
    }

    async fn update(
        &self,
        actor: &ActorContext,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Document, StoreError> {
        // Ownership check happens in get()
        let mut doc = DocumentStore::get(self, actor, id).await?;

        if let Some(title) = title {
            doc.title = title.to_string();
        }
        if let Some(content) = content {
            doc.content = content.to_string();
        }
        doc.updated_at = Utc::now();

        sqlx::query(
            "UPDATE documents SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4 AND actor_id = ?5",
        )
        .bind(&doc.title)
        .bind(&doc.content)
        .bind(doc.updated_at.to_rfc3339())
        .bind(&doc.id)
        .bind(&actor.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("update document: {e}")))?;

        Ok(doc)
    }

    async fn list_by_actor(&self, actor: &ActorContext) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, actor_id, title, content, created_at, updated_at
            FROM documents WHERE actor_id = ?1 ORDER BY updated_at DESC
            "#,
        )
        .bind(&actor.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("list documents: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| Document {
                id: row.get("id"),
                actor_id: row.get("actor_id"),
                title: row.get("title"),
                content: row.get("content"),
                created_at: parse_timestamp(&row.get::<String, _>("created_at")),
                updated_at: parse_timestamp(&row.get::<String, _>("updated_at")),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteStore {
        SqliteStore::new(":memory:").await.unwrap()
    }

    fn alice() -> ActorContext {
        ActorContext::new("alice", "Alice")
    }

    fn bob() -> ActorContext {
        ActorContext::new("bob", "Bob")
    }

    #[tokio::test]
    async fn ensure_actor_is_idempotent() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();
        store.ensure_actor(&alice()).await.unwrap();

        // Display name updates follow the latest call
        let renamed = ActorContext::new("alice", "Alice B.");
        store.ensure_actor(&renamed).await.unwrap();
    }

    #[tokio::test]
    async fn create_and_resolve_chat() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();

        let id = store
            .resolve_or_create_chat(&alice(), None, "hello")
            .await
            .unwrap();
        let resolved = store
            .resolve_or_create_chat(&alice(), Some(id.clone()), "hello")
            .await
            .unwrap();
        assert_eq!(id, resolved);
    }

    #[tokio::test]
    async fn new_chat_title_comes_from_first_message() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();

        let id = store
            .resolve_or_create_chat(&alice(), None, "Draft the quarterly report")
            .await
            .unwrap();
        assert_eq!(
            store.chat_title(&id).await.unwrap().as_deref(),
            Some("Draft the quarterly report")
        );
    }

    #[tokio::test]
    async fn foreign_chat_is_forbidden() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();
        store.ensure_actor(&bob()).await.unwrap();

        let id = store.resolve_or_create_chat(&alice(), None, "hello").await.unwrap();
        let err = store
            .resolve_or_create_chat(&bob(), Some(id), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_chat_is_forbidden() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();

        let err = store
            .resolve_or_create_chat(&alice(), Some(ChatId::from("nope")), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn transcript_round_trip_preserves_order() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();
        let chat = store.resolve_or_create_chat(&alice(), None, "hello").await.unwrap();

        store
            .append_message(&chat, &Message::user("first"))
            .await
            .unwrap();
        store
            .append_message(&chat, &Message::assistant("second"))
            .await
            .unwrap();
        store
            .append_message(&chat, &Message::tool_result("call_1", "third"))
            .await
            .unwrap();

        let messages = store.messages(&chat).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn tool_calls_survive_round_trip() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();
        let chat = store.resolve_or_create_chat(&alice(), None, "hello").await.unwrap();

        let msg = Message::assistant_with_tools(
            "",
            vec![MessageToolCall {
                id: "call_1".into(),
                name: "list_documents".into(),
                arguments: "{}".into(),
            }],
        );
        store.append_message(&chat, &msg).await.unwrap();

        let messages = store.messages(&chat).await.unwrap();
        assert_eq!(messages[0].tool_calls.len(), 1);
        assert_eq!(messages[0].tool_calls[0].name, "list_documents");
    }

    #[tokio::test]
    async fn document_crud() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();

        let doc = store
            .create(&alice(), "Notes", "initial content")
            .await
            .unwrap();
        assert_eq!(doc.title, "Notes");

        let fetched = DocumentStore::get(&store, &alice(), &doc.id).await.unwrap();
        assert_eq!(fetched.content, "initial content");

        let updated = store
            .update(&alice(), &doc.id, None, Some("revised"))
            .await
            .unwrap();
        assert_eq!(updated.title, "Notes");
        assert_eq!(updated.content, "revised");

        let listed = store.list_by_actor(&alice()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "revised");
    }

    #[tokio::test]
    async fn documents_are_actor_scoped() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();
        store.ensure_actor(&bob()).await.unwrap();

        let doc = store.create(&alice(), "Private", "secret").await.unwrap();

        let err = DocumentStore::get(&store, &bob(), &doc.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        let err = store
            .update(&bob(), &doc.id, Some("stolen"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));

        assert!(store.list_by_actor(&bob()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let store = test_store().await;
        store.ensure_actor(&alice()).await.unwrap();

        let err = DocumentStore::get(&store, &alice(), "nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
