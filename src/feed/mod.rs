//! Feed retrieval, normalization and fan-out aggregation.
//!
//! - **Parsing**: [`FeedParser`] turns a URL into a [`RawFeed`]; the
//!   production [`HttpFeedParser`] fetches with `reqwest` and parses with `feed-rs`
//! - **Normalization**: [`normalize`] maps a raw feed onto the canonical
//!   [`NormalizedFeed`] shape
//! - **Aggregation**: [`Aggregator`] normalizes many URLs concurrently and
//!   keeps the successes in request order
//!
//! # Example
//!
//! ```ignore
//! use rss_relay::context::RequestContext;
//! use rss_relay::feed::{Aggregator, HttpFeedParser};
//!
//! let parser = Arc::new(HttpFeedParser::new(reqwest::Client::new()));
//! let aggregator = Aggregator::new(parser);
//! let result = aggregator.aggregate(&urls, &RequestContext::background()).await?;
//! ```

mod aggregator;
mod normalizer;
mod parser;
mod types;

pub use aggregator::{AggregationError, Aggregator};
pub use normalizer::{normalize, normalize_raw, FetchError};
pub use parser::{
    parse_feed, FeedParser, HttpFeedParser, ParseError, DEFAULT_FETCH_TIMEOUT,
    DEFAULT_MAX_FEED_SIZE,
};
pub use types::{
    AggregateResult, NormalizedFeed, NormalizedItem, RawFeed, RawImage, RawItem, ValidationResult,
};
