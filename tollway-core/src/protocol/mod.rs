//! Protocol module for LLM request/response structures
//!
//! These are the provider-agnostic shapes every adapter speaks: an ordered
//! list of [`ChatMessage`]s in, one [`NormalizedResponse`] out.

pub mod types;

pub use types::{ChatMessage, MessageRole, NormalizedResponse, Usage};
