//! Tool trait and registry.
//!
//! Tools are the side-effecting edge of the agent loop. Each tool declares a
//! JSON Schema for its input, validates actual input against it before
//! executing, and receives the acting user so it can enforce ownership.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actor::ActorContext;
use crate::error::ToolError;
use crate::model::ToolDefinition;

/// A request to invoke a tool, as issued by the model.
///
/// Serializes with the wire field names clients see on the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Provider-assigned call identifier, used to correlate the result.
    #[serde(rename = "toolCallId")]
    pub id: String,

    /// Name of the tool to invoke.
    #[serde(rename = "toolName")]
    pub name: String,

    /// Parsed JSON input.
    pub input: Value,
}

/// The outcome of one tool invocation, correlated back to its request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The `ToolCallRequest::id` this result answers.
    #[serde(rename = "toolCallId")]
    pub call_id: String,

    /// Name of the tool that ran.
    #[serde(rename = "toolName")]
    pub name: String,

    /// JSON output. For failed calls this carries an error description so
    /// the model can read it and recover.
    pub output: Value,

    /// True when the call failed and `output` describes the error.
    pub is_error: bool,
}

impl ToolCallResult {
    pub fn ok(call_id: impl Into<String>, name: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            output,
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, name: impl Into<String>, message: &str) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            output: serde_json::json!({ "error": message }),
            is_error: true,
        }
    }
}

/// A callable tool exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name, as advertised to the model.
    fn name(&self) -> &str;

    /// Description shown to the model when deciding whether to call.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's input.
    fn input_schema(&self) -> Value;

    /// Execute the tool as `actor`. Implementations must enforce that the
    /// actor owns any resource the call touches.
    async fn execute(
        &self,
        input: Value,
        actor: &ActorContext,
    ) -> std::result::Result<Value, ToolError>;

    /// The definition sent to the model for this tool.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Registry of available tools.
///
/// Built once at startup and shared read-only across requests.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Later registrations with the same name replace
    /// earlier ones.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions for every registered tool, sorted by name so the list
    /// sent to the model is stable across runs.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate input against a tool's schema, then execute it.
    ///
    /// A missing tool, invalid input, or executor failure all come back as
    /// `ToolError`; callers decide how to surface that to the model.
    pub async fn execute(
        &self,
        request: &ToolCallRequest,
        actor: &ActorContext,
    ) -> std::result::Result<Value, ToolError> {
        let tool = self
            .get(&request.name)
            .ok_or_else(|| ToolError::NotFound(request.name.clone()))?;
        validate_input(&tool.input_schema(), &request.input)?;
        tool.execute(request.input.clone(), actor).await
    }
}

/// Check `input` against the subset of JSON Schema our tools use:
/// top-level `required` keys and per-property `type`.
pub fn validate_input(schema: &Value, input: &Value) -> std::result::Result<(), ToolError> {
    let obj = match input.as_object() {
        Some(obj) => obj,
        None => {
            return Err(ToolError::InvalidInput(
                "tool input must be a JSON object".into(),
            ));
        }
    };

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for key in required.iter().filter_map(|k| k.as_str()) {
            if !obj.contains_key(key) {
                return Err(ToolError::InvalidInput(format!(
                    "missing required field: {key}"
                )));
            }
        }
    }

    if let Some(props) = schema.get("properties").and_then(|p| p.as_object()) {
        for (key, value) in obj {
            let Some(expected) = props.get(key).and_then(|p| p.get("type")).and_then(|t| t.as_str())
            else {
                continue;
            };
            let matches = match expected {
                "string" => value.is_string(),
                "number" => value.is_number(),
                "integer" => value.is_i64() || value.is_u64(),
                "boolean" => value.is_boolean(),
                "array" => value.is_array(),
                "object" => value.is_object(),
                _ => true,
            };
            if !matches {
                return Err(ToolError::InvalidInput(format!(
                    "field {key} must be of type {expected}"
                )));
            }
        }
    }

    Ok(())
}
