//! List the acting user's documents.

use std::sync::Arc;

use async_trait::async_trait;
use quillpad_core::actor::ActorContext;
use quillpad_core::error::ToolError;
use quillpad_core::store::DocumentStore;
use quillpad_core::tool::Tool;
use serde_json::Value;

pub struct ListDocumentsTool {
    store: Arc<dyn DocumentStore>,
}

impl ListDocumentsTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListDocumentsTool {
    fn name(&self) -> &str {
        "list_documents"
    }

    fn description(&self) -> &str {
        "List the user's documents, most recently updated first. Returns titles and ids, not full content."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _input: Value,
        actor: &ActorContext,
    ) -> Result<Value, ToolError> {
        let docs = self
            .store
            .list_by_actor(actor)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "list_documents".into(),
                reason: e.to_string(),
            })?;

        let documents: Vec<Value> = docs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "title": d.title,
                    "updatedAt": d.updated_at.to_rfc3339(),
                })
            })
            .collect();

        Ok(serde_json::json!({
            "count": documents.len(),
            "documents": documents,
        }))
    }
}
