//! On-disk primitives backing the durable ACL store.

pub mod journal;

pub use journal::{Journal, JournalRecord, JournalStats};
