//! Client-facing stream events.
//!
//! Everything a chat request sends over the wire is a `StreamEvent`: an
//! ordering index plus a typed payload. The multiplexer assigns indices;
//! payload shapes here are the wire contract, so field names serialize in
//! camelCase.

use serde::{Deserialize, Serialize};

use crate::tool::{ToolCallRequest, ToolCallResult};

/// One event on a chat response stream.
///
/// `index` is strictly increasing within a stream and is the only ordering
/// key clients may rely on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEvent {
    pub index: u64,

    #[serde(flatten)]
    pub payload: StreamPayload,
}

/// The typed payloads a chat stream can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPayload {
    /// A fragment of assistant text.
    #[serde(rename = "text")]
    TextDelta { chunk: String },

    /// The model requested a tool invocation.
    ToolCall { chunk: ToolCallRequest },

    /// A tool invocation completed.
    ToolResult { chunk: ToolCallResult },

    /// Stream metadata, sent before any generated content.
    Meta {
        #[serde(rename = "chatId")]
        chat_id: String,
    },

    /// Terminal success sentinel. Exactly one per stream, always last.
    Done,

    /// Terminal failure notice. Followed only by `Done`.
    Error { message: String },
}

impl StreamPayload {
    /// The SSE event label for this payload.
    pub fn label(&self) -> &'static str {
        match self {
            StreamPayload::TextDelta { .. } => "text",
            StreamPayload::ToolCall { .. } => "tool-call",
            StreamPayload::ToolResult { .. } => "tool-result",
            StreamPayload::Meta { .. } => "meta",
            StreamPayload::Done => "done",
            StreamPayload::Error { .. } => "error",
        }
    }
}
