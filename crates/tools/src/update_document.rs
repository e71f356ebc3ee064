//! Update a document's title and/or content.

use std::sync::Arc;

use async_trait::async_trait;
use quillpad_core::actor::ActorContext;
use quillpad_core::error::ToolError;
use quillpad_core::store::DocumentStore;
use quillpad_core::tool::Tool;
use serde_json::Value;

pub struct UpdateDocumentTool {
    store: Arc<dyn DocumentStore>,
}

impl UpdateDocumentTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateDocumentTool {
    fn name(&self) -> &str {
        "update_document"
    }

    fn description(&self) -> &str {
        "Update a document's title and/or content. Fields not provided are left unchanged."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "The document id"
                },
                "title": {
                    "type": "string",
                    "description": "New title"
                },
                "content": {
                    "type": "string",
                    "description": "New content, replacing the old content entirely"
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
        let title = input["title"].as_str();
        let content = input["content"].as_str();

        if title.is_none() && content.is_none() {
            return Err(ToolError::InvalidInput(
                "provide at least one of 'title' or 'content'".into(),
            ));
        }

        let doc = self
            .store
            .update(actor, id, title, content)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "update_document".into(),
                reason: e.to_string(),
            })?;

        tracing::debug!(actor = %actor.id, document = %doc.id, "Document updated");
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
    async fn updates_content_only() {
        let store = Arc::new(InMemoryStore::new());
        let doc = store.create(&alice(), "Notes", "v1").await.unwrap();

        let tool = UpdateDocumentTool::new(store);
        let output = tool
            .execute(
                serde_json::json!({ "id": doc.id, "content": "v2" }),
                &alice(),
            )
            .await
            .unwrap();
        assert_eq!(output["title"], "Notes");
        assert_eq!(output["content"], "v2");
    }

    #[tokio::test]
    async fn empty_update_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let doc = store.create(&alice(), "Notes", "v1").await.unwrap();

        let tool = UpdateDocumentTool::new(store);
        let err = tool
            .execute(serde_json::json!({ "id": doc.id }), &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn foreign_document_fails() {
        let store = Arc::new(InMemoryStore::new());
        let doc = store.create(&alice(), "Private", "v1").await.unwrap();

        let tool = UpdateDocumentTool::new(store);
        let bob = ActorContext::new("bob", "Bob");
        let err = tool
            .execute(
                serde_json::json!({ "id": doc.id, "content": "hijack" }),
                &bob,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
