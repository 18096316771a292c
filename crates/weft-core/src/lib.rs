//! Core types and trait definitions for the weft file knowledge graph.
//!
//! This crate is deliberately free of OS, database, and regex dependencies.
//! All other crates depend on it; it depends on nothing heavier than serde.

pub mod error;
pub mod event;
pub mod file;
pub mod relation;
pub mod scan;
pub mod store;

pub use error::{Error, Result};
