//! The bounded generate-execute loop.
//!
//! One run alternates between two phases: draining a model generation stream
//! (forwarding text and tool-call events to the client), then executing any
//! requested tools and folding their results back into the conversation. The
//! loop stops when a generation turn requests no tools, when the iteration
//! cap is reached, or when the client disconnects.

use std::sync::Arc;

use quillpad_core::actor::ActorContext;
use quillpad_core::message::{Message, MessageToolCall};
use quillpad_core::model::{GenerateRequest, GenerationEvent, ModelGateway};
use quillpad_core::stream::StreamPayload;
use quillpad_core::tool::{ToolCallRequest, ToolCallResult, ToolRegistry};
use tracing::{debug, warn};

use crate::session::AgentSession;
use crate::stream_writer::StreamWriter;

/// Default bound on model round-trips per request.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

pub struct AgentLoop {
    gateway: Arc<dyn ModelGateway>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    max_iterations: u32,
}

impl AgentLoop {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            gateway,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Drive the loop to completion, writing stream events as they happen.
    ///
    /// Tool failures are folded back into the conversation as error-shaped
    /// results and never abort the run. A model error does: any text already
    /// streamed this turn stays in the session so the caller can persist the
    /// partial transcript.
    pub async fn run(
        &self,
        session: &mut AgentSession,
        actor: &ActorContext,
        writer: &mut StreamWriter,
    ) -> Result<(), quillpad_core::Error> {
        let tool_definitions = self.tools.definitions();

        for iteration in 1..=self.max_iterations {
            // A gone client means nothing we generate can be delivered
            if writer.is_closed() {
                debug!(iteration, "Client disconnected, stopping agent loop");
                return Ok(());
            }

            debug!(iteration, model = %self.model, "Agent loop iteration");

            let request = GenerateRequest {
                model: self.model.clone(),
                messages: session.messages().to_vec(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let mut rx = self.gateway.generate(request).await?;

            let mut turn_text = String::new();
            let mut pending_calls: Vec<ToolCallRequest> = Vec::new();

            while let Some(item) = rx.recv().await {
                match item {
                    Ok(GenerationEvent::TextDelta(chunk)) => {
                        turn_text.push_str(&chunk);
                        session.record_text(&chunk);
                        writer.emit(StreamPayload::TextDelta { chunk }).await;
                    }
                    Ok(GenerationEvent::ToolCall(call)) => {
                        // A repeated call id within one turn is executed once
                        if pending_calls.iter().any(|c| c.id == call.id) {
                            warn!(call_id = %call.id, "Duplicate tool call id, ignoring repeat");
                            continue;
                        }
                        writer
                            .emit(StreamPayload::ToolCall { chunk: call.clone() })
                            .await;
                        pending_calls.push(call);
                    }
                    Err(e) => {
                        // Keep the partial assistant text in the transcript
                        if !turn_text.is_empty() {
                            session.push(Message::assistant(turn_text));
                        }
                        return Err(e.into());
                    }
                }
            }

            if pending_calls.is_empty() {
                // Final text turn
                if !turn_text.is_empty() {
                    session.push(Message::assistant(turn_text));
                }
                return Ok(());
            }

            // Record the assistant turn carrying the calls
            let tool_calls: Vec<MessageToolCall> = pending_calls
                .iter()
                .map(|c| MessageToolCall {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    arguments: serde_json::to_string(&c.input)
                        .unwrap_or_else(|_| "{}".to_string()),
                })
                .collect();
            session.push(Message::assistant_with_tools(turn_text, tool_calls));

            // Execute sequentially, in issuance order
            for call in &pending_calls {
                let result = match self.tools.execute(call, actor).await {
                    Ok(output) => ToolCallResult::ok(&call.id, &call.name, output),
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "Tool execution failed");
                        ToolCallResult::error(&call.id, &call.name, &e.to_string())
                    }
                };

                writer
                    .emit(StreamPayload::ToolResult {
                        chunk: result.clone(),
                    })
                    .await;

                let content = serde_json::to_string(&result.output)
                    .unwrap_or_else(|_| "{}".to_string());
                session.push(Message::tool_result(&call.id, content));
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            "Iteration cap reached, ending run with pending tool interest"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{text_turn, tool_call, tool_turn, ScriptedGateway};
    use async_trait::async_trait;
    use quillpad_core::error::ToolError;
    use quillpad_core::stream::StreamEvent;
    use quillpad_core::tool::Tool;
    use quillpad_core::ModelError;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    fn actor() -> ActorContext {
        ActorContext::new("alice", "Alice")
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo input"
        }
        fn input_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, input: Value, _actor: &ActorContext) -> Result<Value, ToolError> {
            Ok(json!({ "echoed": input }))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        fn input_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, _input: Value, _actor: &ActorContext) -> Result<Value, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "broken".into(),
                reason: "backend offline".into(),
            })
        }
    }

    fn registry_with(tools: Vec<Arc<dyn Tool>>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        Arc::new(registry)
    }

    async fn run_and_collect(
        gateway: Arc<ScriptedGateway>,
        tools: Arc<ToolRegistry>,
        max_iterations: u32,
    ) -> (Result<(), quillpad_core::Error>, Vec<StreamEvent>, AgentSession) {
        let (tx, mut rx) = mpsc::channel(64);
        let mut writer = StreamWriter::new(tx);
        let mut session = AgentSession::new(vec![Message::user("hello")]);

        let agent = AgentLoop::new(gateway, "gpt-4o", 0.7, tools)
            .with_max_iterations(max_iterations);
        let result = agent.run(&mut session, &actor(), &mut writer).await;
        match &result {
            Ok(()) => writer.finish().await,
            Err(e) => writer.fail(e.to_string()).await,
        }
        drop(writer);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events, session)
    }

    #[tokio::test]
    async fn plain_text_turn_streams_and_terminates() {
        let gateway = Arc::new(ScriptedGateway::new(vec![text_turn(&["Hel", "lo!"])]));
        let (result, events, session) =
            run_and_collect(gateway.clone(), registry_with(vec![]), 5).await;

        result.unwrap();
        assert_eq!(gateway.call_count(), 1);

        // Contiguous indices, Done last
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.index, i as u64);
        }
        assert_eq!(events.last().unwrap().payload, StreamPayload::Done);

        // Accumulated text equals the concatenation of deltas
        assert_eq!(session.accumulated_text(), "Hello!");
        assert_eq!(session.new_messages().len(), 1);
        assert_eq!(session.new_messages()[0].content, "Hello!");
    }

    #[tokio::test]
    async fn tool_turn_pairs_call_and_result_ids() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_turn(vec![tool_call("call_1", "echo", json!({ "x": 1 }))]),
            text_turn(&["done"]),
        ]));
        let (result, events, session) =
            run_and_collect(gateway.clone(), registry_with(vec![Arc::new(EchoTool)]), 5).await;

        result.unwrap();
        assert_eq!(gateway.call_count(), 2);

        let call_ids: Vec<&str> = events
            .iter()
            .filter_map(|e| match &e.payload {
                StreamPayload::ToolCall { chunk } => Some(chunk.id.as_str()),
                _ => None,
            })
            .collect();
        let result_ids: Vec<&str> = events
            .iter()
            .filter_map(|e| match &e.payload {
                StreamPayload::ToolResult { chunk } => Some(chunk.call_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(call_ids, vec!["call_1"]);
        assert_eq!(result_ids, vec!["call_1"]);

        // Transcript: assistant(with calls), tool result, final assistant
        let new = session.new_messages();
        assert_eq!(new.len(), 3);
        assert_eq!(new[0].tool_calls.len(), 1);
        assert_eq!(new[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(new[2].content, "done");
    }

    #[tokio::test]
    async fn iteration_cap_stops_a_tool_hungry_model() {
        // Every turn requests another tool call; the loop must stop at the cap
        let turns: Vec<_> = (0..10)
            .map(|i| tool_turn(vec![tool_call(&format!("call_{i}"), "echo", json!({}))]))
            .collect();
        let gateway = Arc::new(ScriptedGateway::new(turns));
        let (result, events, _session) =
            run_and_collect(gateway.clone(), registry_with(vec![Arc::new(EchoTool)]), 3).await;

        result.unwrap();
        assert_eq!(gateway.call_count(), 3);
        assert_eq!(events.last().unwrap().payload, StreamPayload::Done);
    }

    #[tokio::test]
    async fn failing_tool_becomes_error_result_and_loop_continues() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_turn(vec![tool_call("call_1", "broken", json!({}))]),
            text_turn(&["recovered"]),
        ]));
        let (result, events, session) = run_and_collect(
            gateway.clone(),
            registry_with(vec![Arc::new(FailingTool)]),
            5,
        )
        .await;

        result.unwrap();
        assert_eq!(gateway.call_count(), 2);

        let error_result = events
            .iter()
            .find_map(|e| match &e.payload {
                StreamPayload::ToolResult { chunk } => Some(chunk.clone()),
                _ => None,
            })
            .unwrap();
        assert!(error_result.is_error);
        assert!(error_result.output["error"]
            .as_str()
            .unwrap()
            .contains("backend offline"));

        // The model saw the error and produced a final answer
        assert_eq!(session.accumulated_text(), "recovered");
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_result() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_turn(vec![tool_call("call_1", "no_such_tool", json!({}))]),
            text_turn(&["ok"]),
        ]));
        let (result, events, _session) =
            run_and_collect(gateway, registry_with(vec![]), 5).await;

        result.unwrap();
        let error_result = events
            .iter()
            .find_map(|e| match &e.payload {
                StreamPayload::ToolResult { chunk } => Some(chunk.clone()),
                _ => None,
            })
            .unwrap();
        assert!(error_result.is_error);
        assert!(error_result.output["error"]
            .as_str()
            .unwrap()
            .contains("no_such_tool"));
    }

    #[tokio::test]
    async fn duplicate_call_ids_execute_once() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_turn(vec![
                tool_call("call_1", "echo", json!({})),
                tool_call("call_1", "echo", json!({})),
            ]),
            text_turn(&["ok"]),
        ]));
        let (result, events, _session) =
            run_and_collect(gateway, registry_with(vec![Arc::new(EchoTool)]), 5).await;

        result.unwrap();
        let results = events
            .iter()
            .filter(|e| matches!(e.payload, StreamPayload::ToolResult { .. }))
            .count();
        assert_eq!(results, 1);
    }

    #[tokio::test]
    async fn model_error_keeps_partial_text_and_fails_stream() {
        let gateway = Arc::new(ScriptedGateway::new(vec![vec![
            Ok(GenerationEvent::TextDelta("partial ".into())),
            Err(ModelError::StreamInterrupted("connection reset".into())),
        ]]));
        let (result, events, session) =
            run_and_collect(gateway, registry_with(vec![]), 5).await;

        assert!(result.is_err());

        // Partial text stays in the transcript
        assert_eq!(session.new_messages().len(), 1);
        assert_eq!(session.new_messages()[0].content, "partial ");

        // Wire: text, error, done
        assert!(matches!(
            events[events.len() - 2].payload,
            StreamPayload::Error { .. }
        ));
        assert_eq!(events.last().unwrap().payload, StreamPayload::Done);
    }

    #[tokio::test]
    async fn disconnect_stops_further_model_calls() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_turn(vec![tool_call("call_1", "echo", json!({}))]),
            text_turn(&["never delivered"]),
        ]));

        let (tx, rx) = mpsc::channel(64);
        let mut writer = StreamWriter::new(tx);
        drop(rx); // client gone before the run starts

        let mut session = AgentSession::new(vec![Message::user("hello")]);
        let agent = AgentLoop::new(
            gateway.clone(),
            "gpt-4o",
            0.7,
            registry_with(vec![Arc::new(EchoTool)]),
        );

        // First emit discovers the disconnect, after which no further
        // gateway calls are issued
        agent.run(&mut session, &actor(), &mut writer).await.unwrap();
        assert!(gateway.call_count() <= 1);
    }

    /// Drops the held receiver when executed, simulating a client that
    /// disconnects while a tool is running.
    struct DisconnectingTool {
        rx: std::sync::Mutex<Option<mpsc::Receiver<StreamEvent>>>,
    }

    #[async_trait]
    impl Tool for DisconnectingTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo input, dropping the client mid-execution"
        }
        fn input_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, input: Value, _actor: &ActorContext) -> Result<Value, ToolError> {
            drop(self.rx.lock().unwrap().take());
            Ok(json!({ "echoed": input }))
        }
    }

    #[tokio::test]
    async fn mid_run_disconnect_finishes_tool_but_emits_nothing_more() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            tool_turn(vec![tool_call("call_1", "echo", json!({ "x": 1 }))]),
            text_turn(&["never delivered"]),
        ]));

        let (tx, rx) = mpsc::channel(64);
        let mut writer = StreamWriter::new(tx);
        let tool = DisconnectingTool {
            rx: std::sync::Mutex::new(Some(rx)),
        };

        let mut session = AgentSession::new(vec![Message::user("hello")]);
        let agent = AgentLoop::new(
            gateway.clone(),
            "gpt-4o",
            0.7,
            registry_with(vec![Arc::new(tool)]),
        );
        agent.run(&mut session, &actor(), &mut writer).await.unwrap();

        // The in-flight execution ran to completion and its result is in
        // the transcript, ready to be persisted
        let new = session.new_messages();
        assert_eq!(new.len(), 2);
        assert_eq!(new[0].tool_calls.len(), 1);
        assert_eq!(new[1].tool_call_id.as_deref(), Some("call_1"));
        assert!(new[1].content.contains("echoed"));

        // Only the tool-call frame went out before the disconnect; the
        // result emit was a no-op and no second model turn was issued
        assert!(writer.is_closed());
        assert_eq!(writer.emitted(), 1);
        assert_eq!(gateway.call_count(), 1);
    }
}
