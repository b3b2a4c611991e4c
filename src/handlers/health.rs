// GET /health and GET / handlers

use std::convert::Infallible;

use crate::models::{HealthResponse, RootResponse};

pub const SERVICE_BANNER: &str = "Streaming RAG chat with conversation memory";

pub async fn health_handler() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&HealthResponse::healthy()))
}

pub async fn root_handler() -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::json(&RootResponse {
        message: SERVICE_BANNER.to_string(),
    }))
}
