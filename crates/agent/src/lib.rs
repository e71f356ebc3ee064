//! The Quillpad agent loop.
//!
//! Glue between a `ModelGateway`, the tool registry, and the client-facing
//! event stream: [`AgentLoop`] drives bounded generate-execute rounds,
//! [`StreamWriter`] multiplexes everything onto one ordered stream, and
//! [`AgentSession`] tracks the transcript a run produces.

pub mod loop_runner;
pub mod session;
pub mod stream_writer;
pub mod test_helpers;

pub use loop_runner::{AgentLoop, DEFAULT_MAX_ITERATIONS};
pub use session::AgentSession;
pub use stream_writer::StreamWriter;
