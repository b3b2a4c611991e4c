//! OpenAI provider implementation
//!
//! Streams completions from the Chat Completions API (or any server that
//! speaks the same protocol at `OPENAI_BASE_URL`).

pub mod client;
pub mod mapper;
pub mod types;

pub use client::OpenAiClient;
