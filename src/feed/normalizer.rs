use crate::feed::parser::{FeedParser, ParseError};
use crate::feed::types::{NormalizedFeed, NormalizedItem, RawFeed, RawImage, RawItem};
use chrono::SecondsFormat;
use thiserror::Error;

/// A single URL could not be turned into a [`NormalizedFeed`].
#[derive(Debug, Error)]
#[error("failed to parse RSS feed: {source}")]
pub struct FetchError {
    /// The URL that was requested
    pub url: String,
    #[source]
    pub source: ParseError,
}

/// Fetches `url` through `parser` and maps the result into the canonical shape.
///
/// The parser is called exactly once. Rejecting an empty `url` is the
/// caller's job.
///
/// # Errors
///
/// Returns [`FetchError`] wrapping whatever the parser reported.
pub async fn normalize(parser: &dyn FeedParser, url: &str) -> Result<NormalizedFeed, FetchError> {
    let raw = parser.parse(url).await.map_err(|source| {
        tracing::debug!(url = %url, error = %source, "Parsing RSS feed failed");
        FetchError {
            url: url.to_owned(),
            source,
        }
    })?;

    Ok(normalize_raw(url, raw))
}

/// Pure field mapping from parser output to the canonical shape.
///
/// `url` is stored verbatim, whatever the parser followed to get there.
pub fn normalize_raw(url: &str, raw: RawFeed) -> NormalizedFeed {
    NormalizedFeed {
        url: url.to_owned(),
        title: raw.title,
        description: non_empty(raw.description),
        image_url: image_url(raw.image),
        items: raw.items.into_iter().map(normalize_item).collect(),
    }
}

fn normalize_item(item: RawItem) -> NormalizedItem {
    // Length check, not trim: a whitespace-only description still wins
    let description = non_empty(item.description).or_else(|| non_empty(item.content));

    NormalizedItem {
        url: item.link,
        title: item.title,
        description,
        image_url: image_url(item.image),
        date: item
            .published
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn image_url(image: Option<RawImage>) -> Option<String> {
    image.map(|img| img.url)
}
