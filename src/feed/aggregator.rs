use crate::context::RequestContext;
use crate::feed::normalizer::{normalize, FetchError};
use crate::feed::parser::FeedParser;
use crate::feed::types::{AggregateResult, NormalizedFeed};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Batch-level failure of [`Aggregator::aggregate`].
///
/// Individual URL failures never show up here; they are dropped from the
/// result unless every URL failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// The request context was cancelled or its deadline passed before every
    /// outcome arrived
    #[error("timeout while fetching feeds")]
    Timeout,
    /// Not a single URL produced a feed
    #[error("failed to parse any of the provided RSS feeds ({attempted} attempted)")]
    AllFailed { attempted: usize },
}

/// Index-tagged outcome sent back by each fetch task.
struct Outcome {
    index: usize,
    result: Result<NormalizedFeed, FetchError>,
}

/// Fans a list of URLs out to one task each and reassembles the successes in
/// request order.
///
/// There is no concurrency cap: a batch of N URLs starts N fetches at once.
#[derive(Clone)]
pub struct Aggregator {
    parser: Arc<dyn FeedParser>,
    abort_stragglers: bool,
}

impl Aggregator {
    pub fn new(parser: Arc<dyn FeedParser>) -> Self {
        Self {
            parser,
            abort_stragglers: false,
        }
    }

    /// When set, fetches still running after a timeout are aborted instead of
    /// being left to finish on their own.
    pub fn abort_stragglers(mut self, abort: bool) -> Self {
        self.abort_stragglers = abort;
        self
    }

    /// Normalizes every URL concurrently and returns the feeds that succeeded.
    ///
    /// # Ordering
    ///
    /// The returned feeds follow the order of `urls`, independent of which
    /// fetch completed first. Failed URLs are omitted, not padded.
    ///
    /// # Errors
    ///
    /// - [`AggregationError::Timeout`] as soon as `ctx` is done, even if some
    ///   outcomes are already buffered
    /// - [`AggregationError::AllFailed`] when no URL succeeded (including an
    ///   empty `urls`, which callers are expected to reject earlier)
    pub async fn aggregate(
        &self,
        urls: &[String],
        ctx: &RequestContext,
    ) -> Result<AggregateResult, AggregationError> {
        let total = urls.len();
        let started = Instant::now();

        // One slot per task; sends never wait
        let (tx, mut rx) = mpsc::channel::<Outcome>(total.max(1));

        let handles: Vec<JoinHandle<()>> = urls
            .iter()
            .enumerate()
            .map(|(index, url)| {
                let tx = tx.clone();
                let parser = Arc::clone(&self.parser);
                let url = url.clone();

                tokio::spawn(async move {
                    let result = normalize(parser.as_ref(), &url).await;
                    // Receiver is gone once the aggregator timed out; the outcome is discarded
                    let _ = tx.send(Outcome { index, result }).await;
                })
            })
            .collect();
        drop(tx);

        let mut slots: Vec<Option<NormalizedFeed>> = (0..total).map(|_| None).collect();
        let mut received = 0;

        while received < total {
            let outcome = tokio::select! {
                biased;
                _ = ctx.done() => {
                    tracing::warn!(
                        received = received,
                        total = total,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Request context done before all feeds completed"
                    );
                    if self.abort_stragglers {
                        for handle in &handles {
                            handle.abort();
                        }
                    }
                    return Err(AggregationError::Timeout);
                }
                outcome = rx.recv() => outcome,
            };

            // All senders dropped without reporting: remaining tasks panicked
            let Some(Outcome { index, result }) = outcome else {
                tracing::warn!(
                    missing = total - received,
                    "Fetch tasks ended without reporting an outcome"
                );
                break;
            };
            received += 1;

            match result {
                Ok(feed) => slots[index] = Some(feed),
                Err(e) => {
                    tracing::warn!(index = index, url = %e.url, error = %e, "Feed excluded from batch");
                }
            }
        }

        let feeds: Vec<NormalizedFeed> = slots.into_iter().flatten().collect();

        tracing::debug!(
            total = total,
            succeeded = feeds.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Aggregated feeds"
        );

        if feeds.is_empty() {
            return Err(AggregationError::AllFailed { attempted: total });
        }

        Ok(AggregateResult { feeds })
    }
}
