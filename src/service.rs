//! Request handlers for the three RPC operations.
//!
//! Handlers only check the top-level request shape, delegate to the
//! normalizer or the aggregator, and translate their errors into
//! [`ServiceError`] status codes. They hold no per-request state.

use crate::context::RequestContext;
use crate::feed::{
    normalize, AggregateResult, AggregationError, Aggregator, FeedParser, FetchError,
    NormalizedFeed, ValidationResult,
};
use std::sync::Arc;
use thiserror::Error;

/// RPC-level failure, carrying the status code and a human-readable message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Malformed request; retrying the same request will not help
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    DeadlineExceeded(String),
}

impl ServiceError {
    /// Stable machine-readable code for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidArgument(_) => "invalid_argument",
            ServiceError::Internal(_) => "internal",
            ServiceError::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<AggregationError> for ServiceError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::Timeout => ServiceError::DeadlineExceeded(err.to_string()),
            AggregationError::AllFailed { .. } => ServiceError::Internal(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct FeedService {
    parser: Arc<dyn FeedParser>,
    aggregator: Aggregator,
}

impl FeedService {
    pub fn new(parser: Arc<dyn FeedParser>) -> Self {
        tracing::info!("Initializing the RSS service");
        let aggregator = Aggregator::new(Arc::clone(&parser));
        Self { parser, aggregator }
    }

    /// Replaces the aggregator, e.g. to enable straggler abort.
    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// `GetFeed`: fetch and normalize one feed.
    pub async fn get_feed(&self, url: &str) -> Result<NormalizedFeed, ServiceError> {
        if url.is_empty() {
            tracing::info!("URL cannot be empty");
            return Err(ServiceError::InvalidArgument("URL cannot be empty".into()));
        }

        normalize(self.parser.as_ref(), url).await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to parse RSS feed");
            ServiceError::from(e)
        })
    }

    /// `GetFeeds`: fetch many feeds concurrently, keeping successes in request order.
    pub async fn get_feeds(
        &self,
        urls: &[String],
        ctx: &RequestContext,
    ) -> Result<AggregateResult, ServiceError> {
        if urls.is_empty() {
            tracing::info!("URL list cannot be empty");
            return Err(ServiceError::InvalidArgument(
                "URL list cannot be empty".into(),
            ));
        }

        self.aggregator.aggregate(urls, ctx).await.map_err(|e| {
            tracing::warn!(count = urls.len(), error = %e, "Failed to aggregate RSS feeds");
            ServiceError::from(e)
        })
    }

    /// `ValidateFeed`: reports whether `url` normalizes; the cause of a failure
    /// is not returned.
    pub async fn validate_feed(&self, url: &str) -> Result<ValidationResult, ServiceError> {
        if url.is_empty() {
            tracing::info!("URL cannot be empty");
            return Err(ServiceError::InvalidArgument("URL cannot be empty".into()));
        }

        let is_valid = match normalize(self.parser.as_ref(), url).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Feed failed validation");
                false
            }
        };

        Ok(ValidationResult {
            url: url.to_owned(),
            is_valid,
        })
    }
}
