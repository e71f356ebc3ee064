//! `POST /v1/chat` — the streaming chat endpoint.
//!
//! Request lifecycle:
//!
//! 1. Authenticate the bearer token and resolve the actor (plain JSON 401/403
//!    before any stream bytes).
//! 2. Resolve or create the chat; foreign chats are refused.
//! 3. Start the SSE stream with a `meta` event carrying the chat id, which is
//!    also exposed as the `x-chat-id` response header.
//! 4. Run the agent loop under the request timeout, forwarding every event.
//! 5. Persist the transcript under the per-chat lock, including partial
//!    assistant text when the model failed mid-stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::Json,
    response::sse::{Event as SseEvent, Sse},
};
use serde::Deserialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use quillpad_agent::{AgentLoop, AgentSession, StreamWriter};
use quillpad_core::actor::ActorContext;
use quillpad_core::error::{ModelError, StoreError};
use quillpad_core::message::{ChatId, Message, Role};
use quillpad_core::store::ChatStore;
use quillpad_core::stream::StreamPayload;

use crate::{ErrorResponse, SharedState, error_response};

const SYSTEM_PROMPT: &str = "You are Quillpad, a document assistant. You help the user create, \
read, update, and organize their documents using the available tools. Be concise; when a tool \
call fails, explain what went wrong and suggest a correction.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The conversation as the client sees it. Only the final message is
    /// recorded; the server-side transcript is authoritative for history.
    /// The final entry must have role `user`.
    pub messages: Vec<InboundMessage>,

    /// Continue an existing chat; omitted means start a new one.
    #[serde(default)]
    pub chat_id: Option<String>,

    /// Model override for this request.
    #[serde(default)]
    pub model: Option<String>,

    /// Per-request timeout override in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub role: Role,
    pub content: String,
}

type PreStreamError = (StatusCode, Json<ErrorResponse>);

/// Resolve the bearer token to an actor, or fail with a plain 401.
fn authenticate(state: &SharedState, headers: &HeaderMap) -> Result<ActorContext, PreStreamError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Missing bearer token"))?;

    let actor = state
        .config
        .actor_for_token(token)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Unknown bearer token"))?;

    Ok(ActorContext::new(&actor.id, &actor.display_name))
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<
    (
        [(header::HeaderName, String); 1],
        Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>,
    ),
    PreStreamError,
> {
    let actor = authenticate(&state, &headers)?;

    // The final inbound message is the new turn; everything before it is
    // client-held history, already persisted by earlier requests
    let user_text = match payload.messages.last() {
        Some(m) if m.role == Role::User && !m.content.trim().is_empty() => m.content.clone(),
        Some(_) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Last message must be a non-empty user message",
            ));
        }
        None => return Err(error_response(StatusCode::BAD_REQUEST, "No messages")),
    };

    state
        .chat_store
        .ensure_actor(&actor)
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let requested = payload.chat_id.as_deref().map(ChatId::from);
    let chat_id = state
        .chat_store
        .resolve_or_create_chat(&actor, requested, &user_text)
        .await
        .map_err(|e| match e {
            StoreError::Forbidden(_) => {
                error_response(StatusCode::FORBIDDEN, "Chat does not belong to this user")
            }
            other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        })?;

    let model = payload
        .model
        .clone()
        .unwrap_or_else(|| state.config.default_model.clone());

    // Model routing failures are pre-stream errors too
    let gateway = state.resolver.resolve(&model).map_err(|e| match e {
        ModelError::UnknownModel(_) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        other => error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;

    // Conversation so far, with the system prompt pinned first
    let mut messages = state
        .chat_store
        .messages(&chat_id)
        .await
        .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if messages.is_empty() {
        messages.push(Message::system(SYSTEM_PROMPT));
    }
    let user_message = Message::user(&user_text);
    messages.push(user_message.clone());

    info!(actor = %actor.id, chat = %chat_id, model = %model, "Chat request");

    let timeout = Duration::from_secs(
        payload
            .timeout_secs
            .unwrap_or(state.config.request_timeout_secs),
    );

    let agent = AgentLoop::new(gateway, &model, state.config.default_temperature, state.tools.clone())
        .with_max_tokens(state.config.default_max_tokens)
        .with_max_iterations(state.config.max_iterations);

    let (tx, rx) = tokio::sync::mpsc::channel(64);
    let task_state = state.clone();
    let task_chat_id = chat_id.clone();

    tokio::spawn(async move {
        let mut writer = StreamWriter::new(tx);
        let mut session = AgentSession::new(messages);

        // First event on every stream
        writer
            .emit(StreamPayload::Meta {
                chat_id: task_chat_id.0.clone(),
            })
            .await;

        // The deadline covers the whole run, so expiry drops the loop
        // future and can cancel a tool executor at its next await point.
        // Tool bodies must stay single store calls for that cancellation
        // to be side-effect free.
        match tokio::time::timeout(timeout, agent.run(&mut session, &actor, &mut writer)).await {
            Ok(Ok(())) => writer.finish().await,
            Ok(Err(e)) => {
                warn!(chat = %task_chat_id, error = %e, "Agent run failed");
                writer.fail(e.to_string()).await;
            }
            Err(_) => {
                warn!(chat = %task_chat_id, timeout_secs = timeout.as_secs(), "Chat request timed out");
                writer.fail("Request timed out").await;
            }
        }

        // Persist the turn under the per-chat lock. The user message and
        // whatever the run produced (including partial text after a model
        // failure) go in together.
        let lock = task_state.chat_locks.for_chat(&task_chat_id);
        let _guard = lock.lock().await;

        if let Err(e) = persist_turn(&task_state, &task_chat_id, &user_message, &session).await {
            warn!(chat = %task_chat_id, error = %e, "Failed to persist transcript");
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        let label = event.payload.label();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(label).data(data))
    });

    let chat_id_header = (
        header::HeaderName::from_static("x-chat-id"),
        chat_id.0.clone(),
    );

    Ok(([chat_id_header], Sse::new(stream)))
}

/// Write one completed turn to the chat store.
async fn persist_turn(
    state: &SharedState,
    chat_id: &ChatId,
    user_message: &Message,
    session: &AgentSession,
) -> Result<(), StoreError> {
    state.chat_store.append_message(chat_id, user_message).await?;
    for message in session.new_messages() {
        state.chat_store.append_message(chat_id, message).await?;
    }
    state.chat_store.touch_chat(chat_id).await
}
