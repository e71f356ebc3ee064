//! Scripted gateway for loop and handler tests.

use std::sync::Mutex;

use async_trait::async_trait;
use quillpad_core::error::ModelError;
use quillpad_core::model::{GenerateRequest, GenerationEvent, ModelGateway};
use quillpad_core::tool::ToolCallRequest;

/// One scripted generation turn: the items the stream will yield, in order.
pub type ScriptedTurn = Vec<Result<GenerationEvent, ModelError>>;

/// A mock gateway that plays back a sequence of scripted turns.
///
/// Each call to `generate` consumes the next turn. Panics if more calls are
/// made than turns provided.
pub struct ScriptedGateway {
    turns: Mutex<Vec<ScriptedTurn>>,
    call_count: Mutex<usize>,
}

impl ScriptedGateway {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Mutex::new(turns),
            call_count: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        _request: GenerateRequest,
    ) -> Result<
        tokio::sync::mpsc::Receiver<Result<GenerationEvent, ModelError>>,
        ModelError,
    > {
        let turn = {
            let mut count = self.call_count.lock().unwrap();
            let mut turns = self.turns.lock().unwrap();
            if *count >= turns.len() {
                panic!(
                    "ScriptedGateway: no more turns (call #{}, have {})",
                    *count,
                    turns.len()
                );
            }
            let turn = std::mem::take(&mut turns[*count]);
            *count += 1;
            turn
        };

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        tokio::spawn(async move {
            for item in turn {
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// A turn that streams the given text fragments and ends.
pub fn text_turn(fragments: &[&str]) -> ScriptedTurn {
    fragments
        .iter()
        .map(|f| Ok(GenerationEvent::TextDelta((*f).to_string())))
        .collect()
}

/// A turn that requests the given tool calls (no text).
pub fn tool_turn(calls: Vec<ToolCallRequest>) -> ScriptedTurn {
    calls
        .into_iter()
        .map(|c| Ok(GenerationEvent::ToolCall(c)))
        .collect()
}

/// Helper to build a tool call request.
pub fn tool_call(id: &str, name: &str, input: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        input,
    }
}
