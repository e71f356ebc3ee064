//! The authenticated identity on whose behalf tools execute.

use serde::{Deserialize, Serialize};

/// The actor a request runs as. Every tool executor receives this and must
/// enforce ownership on any resource it touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// Stable actor identifier.
    pub id: String,

    /// Human-readable name for display and persistence.
    pub display_name: String,
}

impl ActorContext {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}
