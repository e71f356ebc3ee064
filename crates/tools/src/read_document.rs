//! Read a document by id, scoped to the acting user.

use std::sync::Arc;

use async_trait::async_trait;
use quillpad_core::actor::ActorContext;
use quillpad_core::error::ToolError;
use quillpad_core::store::DocumentStore;
use quillpad_core::tool::Tool;
use serde_json::Value;

pub struct ReadDocumentTool {
    store: Arc<dyn DocumentStore>,
}

impl ReadDocumentTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadDocumentTool {
    fn name(&self) -> &str {
        "read_document"
    }

    fn description(&self) -> &str {
        "Read a document's title and content by its id."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "The document id"
                }
            },
            "required": ["id"]
        })
    }

    async fn execute(
        &self,
        input: Value,
        actor: &ActorContext,
    ) -> Result<Value, ToolError> {
        let id = input["id"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidInput("missing 'id'".into()))?;

        let doc = self
            .store
            .get(actor, id)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "read_document".into(),
                reason: e.to_string(),
            })?;

        Ok(crate::document_json(&doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillpad_store::InMemoryStore;

    fn alice() -> ActorContext {
        ActorContext::new("alice", "Alice")
    }

    #[tokio::test]
    async fn reads_own_document() {
        let store = Arc::new(InMemoryStore::new());
        let doc = store.create(&alice(), "Notes", "body").await.unwrap();

        let tool = ReadDocumentTool::new(store);
        let output = tool
            .execute(serde_json::json!({ "id": doc.id }), &alice())
            .await
            .unwrap();
        assert_eq!(output["content"], "body");
    }

    #[tokio::test]
    async fn foreign_document_fails() {
        let store = Arc::new(InMemoryStore::new());
        let doc = store.create(&alice(), "Private", "secret").await.unwrap();

        let tool = ReadDocumentTool::new(store);
        let bob = ActorContext::new("bob", "Bob");
        let err = tool
            .execute(serde_json::json!({ "id": doc.id }), &bob)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
        assert!(err.to_string().contains("Forbidden"));
    }

    #[tokio::test]
    async fn missing_document_fails() {
        let tool = ReadDocumentTool::new(Arc::new(InMemoryStore::new()));
        let err = tool
            .execute(serde_json::json!({ "id": "nope" }), &alice())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not found"));
    }
}
