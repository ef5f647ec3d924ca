use super::{AppState, REQUEST_TIMEOUT_HEADER};
use crate::context::RequestContext;
use crate::feed::{AggregateResult, NormalizedFeed, ValidationResult};
use crate::service::ServiceError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

// Missing fields decode to empty values so they reach the InvalidArgument checks

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetRssFeedRequest {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetRssFeedsRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateRssFeedRequest {
    pub url: String,
}

/// POST /rss.RssService/GetRssFeed
pub async fn get_rss_feed(
    State(state): State<AppState>,
    payload: Result<Json<GetRssFeedRequest>, JsonRejection>,
) -> Result<Json<NormalizedFeed>, ServiceError> {
    let request = json_body(payload)?;
    state.service.get_feed(&request.url).await.map(Json)
}

/// POST /rss.RssService/GetRssFeeds
///
/// The deadline comes from the `x-request-timeout-ms` header, falling back to
/// the configured default. Dropping this future (client went away) cancels
/// the context.
pub async fn get_rss_feeds(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GetRssFeedsRequest>, JsonRejection>,
) -> Result<Json<AggregateResult>, ServiceError> {
    let request = json_body(payload)?;
    let timeout = request_timeout(&headers)?.or(state.default_timeout);
    let ctx = match timeout {
        Some(timeout) => RequestContext::with_timeout(timeout),
        None => RequestContext::background(),
    };
    let _guard = ctx.drop_guard();

    state.service.get_feeds(&request.urls, &ctx).await.map(Json)
}

/// POST /rss.RssService/ValidateRssFeed
pub async fn validate_rss_feed(
    State(state): State<AppState>,
    payload: Result<Json<ValidateRssFeedRequest>, JsonRejection>,
) -> Result<Json<ValidationResult>, ServiceError> {
    let request = json_body(payload)?;
    state.service.validate_feed(&request.url).await.map(Json)
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Body decoding failures (bad JSON, wrong content type, wrong field types)
/// are reported through the same envelope as every other bad argument.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| ServiceError::InvalidArgument(rejection.body_text()))
}

fn request_timeout(headers: &HeaderMap) -> Result<Option<Duration>, ServiceError> {
    let Some(value) = headers.get(REQUEST_TIMEOUT_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|ms| Some(Duration::from_millis(ms)))
        .ok_or_else(|| {
            ServiceError::InvalidArgument(format!(
                "{} must be a non-negative integer",
                REQUEST_TIMEOUT_HEADER
            ))
        })
}
