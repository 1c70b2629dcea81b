//! Credential Store: one authority for "is there a usable session, and in which scope".
//!
//! Two physical scopes sit behind it: a durable file ("remember me") and an
//! ephemeral in-memory slot that dies with the process.

pub mod storage;
pub mod store;

pub use storage::{FileStorage, MemoryStorage};
pub use store::CredentialStore;
