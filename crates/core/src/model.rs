//! ModelGateway trait — the abstraction over LLM backends.
//!
//! A gateway knows how to send a conversation to an LLM and hand back a lazy,
//! single-pass sequence of generation events: text fragments and tool-call
//! requests. The agent loop drains that sequence fully before deciding
//! whether tool calls are pending.
//!
//! Implementations: OpenAI-compatible endpoints, Anthropic's Messages API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::message::Message;
use crate::tool::ToolCallRequest;

/// Parameters for one generation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The model identifier (e.g., "gpt-4o", "claude-sonnet-4").
    pub model: String,

    /// The conversation so far.
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call this turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

fn default_temperature() -> f32 {
    0.7
}

/// A tool definition sent to the LLM so it knows what tools it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's input
    pub input_schema: serde_json::Value,
}

/// One unit of a generation turn's output.
///
/// A closed variant set — consumers pattern-match exhaustively instead of
/// shape-sniffing payloads at runtime.
#[derive(Debug, Clone)]
pub enum GenerationEvent {
    /// A fragment of assistant text, in emission order.
    TextDelta(String),

    /// A fully assembled tool-call request. Gateways accumulate provider-side
    /// argument deltas and emit each call exactly once, complete.
    ToolCall(ToolCallRequest),
}

/// The core ModelGateway trait.
///
/// `generate` returns the receiving end of a finite event sequence produced
/// by a single underlying model call. The sequence terminates when the
/// channel closes; a `ModelError` item is fatal for the turn.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// A human-readable name for this gateway (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Start one generation turn and stream its events.
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<GenerationEvent, ModelError>>,
        ModelError,
    >;
}

impl std::fmt::Debug for dyn ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("name", &self.name())
            .finish()
    }
}
