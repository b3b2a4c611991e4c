// GET /conversations/{id} handler

use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info};
use warp::http::StatusCode;
use warp::Reply;

use crate::memory::ConversationMemory;
use crate::models::{ConversationHistory, ErrorDetail};

pub async fn history_handler(
    conversation_id: String,
    memory: Arc<ConversationMemory>,
) -> Result<warp::reply::Response, Infallible> {
    info!(%conversation_id, "GET /conversations");

    match memory.history(&conversation_id).await {
        Ok(messages) => Ok(warp::reply::json(&ConversationHistory {
            conversation_id,
            messages,
        })
        .into_response()),
        Err(e) => {
            error!(%conversation_id, error = %e, "Failed to load conversation history");
            Ok(warp::reply::with_status(
                warp::reply::json(&ErrorDetail {
                    detail: e.to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
            .into_response())
        }
    }
}
