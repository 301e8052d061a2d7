//! Text-generation collaborators for veluria.
//!
//! The core only depends on the [`provider::LlmProvider`] trait; concrete
//! HTTP backends live in [`http`].

pub mod http;
pub mod provider;

pub use provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmError, LlmProvider, MockProvider, Role};
