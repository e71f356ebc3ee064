//! # Quillpad Core
//!
//! Domain types, traits, and error definitions for the Quillpad document
//! assistant. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod actor;
pub mod error;
pub mod message;
pub mod model;
pub mod store;
pub mod stream;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use actor::ActorContext;
pub use error::{Error, ModelError, Result, StoreError, ToolError};
pub use message::{ChatId, Message, MessageToolCall, Role};
pub use model::{GenerateRequest, GenerationEvent, ModelGateway, ToolDefinition};
pub use store::{ChatStore, Document, DocumentStore, derive_chat_title};
pub use stream::{StreamEvent, StreamPayload};
pub use tool::{Tool, ToolCallRequest, ToolCallResult, ToolRegistry};
