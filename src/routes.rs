// Route definitions

use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Rejection};

use crate::handlers;
use crate::memory::ConversationMemory;
use crate::orchestrator::ResponseOrchestrator;

fn with_orchestrator(
    orchestrator: ResponseOrchestrator,
) -> impl Filter<Extract = (ResponseOrchestrator,), Error = Infallible> + Clone {
    warp::any().map(move || orchestrator.clone())
}

fn with_memory(
    memory: Arc<ConversationMemory>,
) -> impl Filter<Extract = (Arc<ConversationMemory>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&memory))
}

/// One path segment, percent-decoded
fn conversation_id() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::path::param::<String>().and_then(|raw: String| async move {
        urlencoding::decode(&raw)
            .map(|id| id.into_owned())
            .map_err(|_| warp::reject::custom(handlers::InvalidPathSegment))
    })
}

pub fn configure_routes(
    orchestrator: ResponseOrchestrator,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let memory = Arc::clone(orchestrator.memory());

    // POST /chat
    let chat = warp::path("chat")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_orchestrator(orchestrator))
        .and_then(handlers::chat_handler);

    // GET /conversations/{conversationId}
    let history = warp::path("conversations")
        .and(conversation_id())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_memory(memory))
        .and_then(handlers::history_handler);

    // GET /health
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handlers::health_handler);

    // GET /
    let root = warp::path::end()
        .and(warp::get())
        .and_then(handlers::root_handler);

    // Any origin, with credentials; the origin is echoed back rather than `*`
    let cors = warp::cors()
        .allow_any_origin()
        .allow_credentials(true)
        .allow_methods(vec![
            "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS",
        ])
        .allow_headers(vec![
            "accept",
            "accept-language",
            "authorization",
            "cache-control",
            "content-language",
            "content-type",
            "last-event-id",
            "origin",
            "pragma",
            "x-requested-with",
        ]);

    chat.or(history)
        .or(health)
        .or(root)
        .with(cors)
        .recover(handlers::handle_rejection)
}
