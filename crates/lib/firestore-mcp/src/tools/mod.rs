//! MCP tool modules.
//!
//! Tools are grouped by what they touch: documents (query, add, get) and
//! collections (top-level and nested listing).

pub mod collections;
pub mod documents;
