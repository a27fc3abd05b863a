//! Data model shared by the Firestore store backends and the MCP tools.
//!
//! This crate defines documents, the in-band reply payloads returned by every
//! tool, the Firestore REST typed-value codec, and resource path helpers.

pub mod models;
pub mod schema;
pub mod value;

pub use models::*;
