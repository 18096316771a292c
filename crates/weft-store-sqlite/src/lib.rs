//! SQLite backend for the weft knowledge store.
//!
//! A single rusqlite connection (file-backed or in-memory) behind a lock:
//! writes serialize through it, matching the store's single-writer model,
//! while the connection itself stays cheap to share.

mod encode;
mod ingest;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
