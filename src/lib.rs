// HTTP server modules
pub mod config;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod routes;
pub mod sse;

// Conversation memory and embedded vector store
pub mod memory;

// LLM abstraction layer
pub mod llm;
