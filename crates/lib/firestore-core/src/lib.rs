//! Core services for firestore-mcp.
//!
//! This crate owns the document-store abstraction and its Firestore REST and
//! in-memory backends, the one-time store initialization, and the control
//! plane that turns store outcomes into in-band tool replies.

pub mod auth;
pub mod control;
pub mod services;
pub mod store;
