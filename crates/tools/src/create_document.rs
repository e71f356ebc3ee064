//! Create a new document owned by the acting user.

use std::sync::Arc;

use async_trait::async_trait;
use quillpad_core::actor::ActorContext;
use quillpad_core::error::ToolError;
use quillpad_core::store::DocumentStore;
use quillpad_core::tool::Tool;
use serde_json::Value;

pub struct CreateDocumentTool {
    store: Arc<dyn DocumentStore>,
}

impl CreateDocumentTool {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateDocumentTool {
    fn name(&self) -> &str {
        "create_document"
    }

    fn description(&self) -> &str {
        "Create a new document with a title and optional initial content."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "The document title"
                },
                "content": {
                    "type": "string",
                    "description": "Initial document content (defaults to empty)"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(
        &self,
        input: Value,
        actor: &ActorContext,
    ) -> Result<Value, ToolError> {
        let title = input["title"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidInput("missing 'title'".into()))?;
        let content = input["content"].as_str().unwrap_or("");

        let doc = self
            .store
            .create(actor, title, content)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "create_document".into(),
                reason: e.to_string(),
            })?;

        tracing::debug!(actor = %actor.id, document = %doc.id, "Document created");
        Ok(crate::document_json(&doc))
    }
}
