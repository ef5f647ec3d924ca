//! HTTP/JSON binding of the RSS service.
//!
//! Each RPC operation is a `POST` route named after its method:
//!
//! - `POST /rss.RssService/GetRssFeed` - `{"url": ...}` → normalized feed
//! - `POST /rss.RssService/GetRssFeeds` - `{"urls": [...]}` → `{"feeds": [...]}`
//! - `POST /rss.RssService/ValidateRssFeed` - `{"url": ...}` → `{"url", "is_valid"}`
//! - `GET /health` - liveness probe
//!
//! Failures are returned as `{"error": {"code", "message"}}` with the HTTP
//! status mapped from [`ServiceError`](crate::service::ServiceError).

use crate::service::FeedService;
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub mod error_response;
mod routes;

pub use error_response::{ApiError, ErrorBody};
pub use routes::{GetRssFeedRequest, GetRssFeedsRequest, ValidateRssFeedRequest};

/// Request header carrying the caller's deadline for `GetRssFeeds`, in milliseconds.
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: FeedService,
    /// Deadline applied to `GetRssFeeds` when the caller sends none
    pub default_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(service: FeedService) -> Self {
        Self {
            service,
            default_timeout: None,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/rss.RssService/GetRssFeed", post(routes::get_rss_feed))
        .route("/rss.RssService/GetRssFeeds", post(routes::get_rss_feeds))
        .route(
            "/rss.RssService/ValidateRssFeed",
            post(routes::validate_rss_feed),
        )
        .route("/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `router` on `listener` until Ctrl+C.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(addr = %addr, "server listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
