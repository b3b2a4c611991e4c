// Renders warp rejections as JSON `{"detail": ...}` bodies

use std::convert::Infallible;
use tracing::warn;
use warp::filters::body::BodyDeserializeError;
use warp::filters::cors::CorsForbidden;
use warp::http::StatusCode;
use warp::reject::{MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType};
use warp::{Rejection, Reply};

use crate::models::ErrorDetail;

/// A path segment that does not percent-decode to UTF-8
#[derive(Debug)]
pub struct InvalidPathSegment;

impl warp::reject::Reject for InvalidPathSegment {}

/// Map a rejection to a status code and message
pub fn rejection_status(err: &Rejection) -> (StatusCode, String) {
    if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if err.find::<InvalidPathSegment>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            "Path segment is not valid percent-encoded UTF-8".to_string(),
        )
    } else if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    } else if let Some(e) = err.find::<UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
    } else if let Some(e) = err.find::<PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
    } else if let Some(e) = err.find::<CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = rejection_status(&err);
    if status.is_server_error() {
        warn!(?err, "Unhandled rejection");
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorDetail { detail }),
        status,
    ))
}
