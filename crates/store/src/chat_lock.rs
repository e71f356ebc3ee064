//! Per-chat write serialization.
//!
//! Transcript persistence for one chat must not interleave with another
//! write to the same chat. Locks are keyed by chat id and created lazily;
//! different chats never contend.

use std::collections::HashMap;
use std::sync::Arc;

use quillpad_core::ChatId;
use tokio::sync::Mutex;

/// Lazily-populated map of per-chat write locks.
#[derive(Default)]
pub struct ChatLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding writes to `chat_id`.
    ///
    /// Callers hold the returned mutex across their whole write sequence.
    pub fn for_chat(&self, chat_id: &ChatId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(chat_id.0.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_chat_shares_a_lock() {
        let locks = ChatLocks::new();
        let id = ChatId::from("chat-1");
        let a = locks.for_chat(&id);
        let b = locks.for_chat(&id);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn different_chats_do_not_contend() {
        let locks = ChatLocks::new();
        let a = locks.for_chat(&ChatId::from("chat-1"));
        let b = locks.for_chat(&ChatId::from("chat-2"));
        assert!(!Arc::ptr_eq(&a, &b));

        // Holding one must not block the other
        let _guard_a = a.lock().await;
        let guard_b = b.try_lock();
        assert!(guard_b.is_ok());
    }

    #[tokio::test]
    async fn lock_serializes_writers() {
        let locks = ChatLocks::new();
        let id = ChatId::from("chat-1");
        let lock = locks.for_chat(&id);

        let guard = lock.lock().await;
        assert!(locks.for_chat(&id).try_lock().is_err());
        drop(guard);
        assert!(locks.for_chat(&id).try_lock().is_ok());
    }
}
