//! API translation between the Chat Completions and Converse formats.
//!
//! The core of the sidecar: converts requests, responses, and streaming
//! events between the two wire formats. All translation functions are pure
//! (no I/O); the only injected capability is the [`crate::clock::Clock`].

pub mod converse_types;
pub mod openai_types;
pub mod request;
pub mod response;
pub mod streaming;
