//! Per-request loop state.

use quillpad_core::message::Message;

/// The conversation state one agent run mutates.
///
/// Messages appended during the run (assistant turns and tool results) are
/// what the caller persists afterwards; `new_messages()` returns exactly that
/// suffix.
pub struct AgentSession {
    messages: Vec<Message>,
    initial_len: usize,
    accumulated_text: String,
}

impl AgentSession {
    /// Start a session from the conversation so far.
    pub fn new(messages: Vec<Message>) -> Self {
        let initial_len = messages.len();
        Self {
            messages,
            initial_len,
            accumulated_text: String::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Record a text fragment streamed by the model.
    pub fn record_text(&mut self, chunk: &str) {
        self.accumulated_text.push_str(chunk);
    }

    /// All assistant text streamed so far, across every iteration.
    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    /// The messages appended since the session started.
    pub fn new_messages(&self) -> &[Message] {
        &self.messages[self.initial_len..]
    }
}
