//! Gemini provider implementation
//!
//! Client for Google's Gemini models via the Generative Language API,
//! authenticated with an API key.

pub mod client;
pub mod mapper;
pub mod types;

pub use client::{GeminiClient, GeminiModel};
