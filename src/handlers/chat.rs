// POST /chat handler

use futures_util::stream::StreamExt;
use std::convert::Infallible;
use tracing::info;

use crate::models::ChatRequest;
use crate::orchestrator::ResponseOrchestrator;
use crate::sse::to_sse_event;

/// Always answers 200 with an event stream; failures travel as `error` events.
pub async fn chat_handler(
    request: ChatRequest,
    orchestrator: ResponseOrchestrator,
) -> Result<impl warp::Reply, Infallible> {
    info!(
        provider = %request.provider,
        conversation_id = ?request.conversation_id,
        "POST /chat"
    );

    let events = orchestrator
        .stream_response(request.message, request.provider, request.conversation_id)
        .map(|event| to_sse_event(&event));

    Ok(warp::sse::reply(warp::sse::keep_alive().stream(events)))
}
