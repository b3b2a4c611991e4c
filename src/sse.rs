use std::convert::Infallible;
use warp::sse::Event;

use crate::models::ChatEvent;

/// Encode a chat event as an SSE `data: <json>` frame
///
/// warp writes `data:` with no space, so the space goes in the payload.
/// SSE parsers strip exactly one leading space, leaving the JSON intact.
pub fn to_sse_event(event: &ChatEvent) -> Result<Event, Infallible> {
    let payload = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => serde_json::json!({"type": "error", "content": e.to_string()}).to_string(),
    };

    Ok(Event::default().data(format!(" {payload}")))
}
