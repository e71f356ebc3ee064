//! Document tools exposed to the Quillpad assistant.
//!
//! Each tool wraps the document store and runs as the authenticated actor,
//! so ownership enforcement happens in the store layer on every call.

pub mod create_document;
pub mod list_documents;
pub mod read_document;
pub mod update_document;

use std::sync::Arc;

use quillpad_core::store::DocumentStore;
use quillpad_core::tool::ToolRegistry;

pub use create_document::CreateDocumentTool;
pub use list_documents::ListDocumentsTool;
pub use read_document::ReadDocumentTool;
pub use update_document::UpdateDocumentTool;

/// Create the default registry with all document tools.
pub fn default_registry(store: Arc<dyn DocumentStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CreateDocumentTool::new(store.clone())));
    registry.register(Arc::new(ReadDocumentTool::new(store.clone())));
    registry.register(Arc::new(UpdateDocumentTool::new(store.clone())));
    registry.register(Arc::new(ListDocumentsTool::new(store)));
    registry
}

/// Render a document as the JSON shape tools return to the model.
pub(crate) fn document_json(doc: &quillpad_core::store::Document) -> serde_json::Value {
    serde_json::json!({
        "id": doc.id,
        "title": doc.title,
        "content": doc.content,
        "createdAt": doc.created_at.to_rfc3339(),
        "updatedAt": doc.updated_at.to_rfc3339(),
    })
}
