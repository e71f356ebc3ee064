//! Persistence backends for Quillpad.
//!
//! `SqliteStore` is the production backend; `InMemoryStore` backs tests and
//! doubles as a reference implementation of the store traits.

pub mod chat_lock;
pub mod in_memory;
pub mod sqlite;

pub use chat_lock::ChatLocks;
pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
