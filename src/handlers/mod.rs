// Request handlers

pub mod chat;
pub mod health;
pub mod history;
pub mod rejection;

pub use chat::chat_handler;
pub use health::{health_handler, root_handler};
pub use history::history_handler;
pub use rejection::{handle_rejection, InvalidPathSegment};
