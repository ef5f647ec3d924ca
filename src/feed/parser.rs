use crate::feed::types::{RawFeed, RawImage, RawItem};
use async_trait::async_trait;
use feed_rs::model::{Entry, Feed, MediaObject};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors produced while retrieving and parsing a single feed document.
///
/// Callers above the parser treat this as an opaque cause; the variants only
/// exist so the message is useful in logs and error responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured fetch timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Capability that turns a URL into a [`RawFeed`].
///
/// The aggregator only ever calls `parse` once per URL; implementations must
/// not retry or cache on their own.
#[async_trait]
pub trait FeedParser: Send + Sync {
    async fn parse(&self, url: &str) -> Result<RawFeed, ParseError>;
}

/// Production parser: HTTP GET with `reqwest`, document parsing with `feed-rs`.
#[derive(Debug, Clone)]
pub struct HttpFeedParser {
    client: reqwest::Client,
    fetch_timeout: Duration,
    max_feed_size: usize,
}

impl HttpFeedParser {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_feed_size: DEFAULT_MAX_FEED_SIZE,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_feed_size(mut self, limit: usize) -> Self {
        self.max_feed_size = limit;
        self
    }

    /// Builds a client with the relay's User-Agent.
    pub fn default_client() -> Result<reqwest::Client, ParseError> {
        reqwest::Client::builder()
            .user_agent(concat!("rss-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ParseError::Network)
    }
}

#[async_trait]
impl FeedParser for HttpFeedParser {
    async fn parse(&self, url: &str) -> Result<RawFeed, ParseError> {
        // The timeout covers the body as well as the headers
        let bytes = tokio::time::timeout(self.fetch_timeout, self.fetch_bytes(url))
            .await
            .map_err(|_| ParseError::Timeout)??;

        parse_feed(&bytes)
    }
}

impl HttpFeedParser {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ParseError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ParseError::Network)?;

        if !response.status().is_success() {
            return Err(ParseError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, self.max_feed_size).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ParseError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ParseError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ParseError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ParseError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Parses an RSS/Atom document into the raw parser model.
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeed, ParseError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| ParseError::Parse(e.to_string()))?;
    Ok(raw_feed_from(feed))
}

fn raw_feed_from(feed: Feed) -> RawFeed {
    let image = feed
        .logo
        .or(feed.icon)
        .map(|img| RawImage { url: img.uri });

    RawFeed {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        description: feed.description.map(|d| d.content).unwrap_or_default(),
        image,
        items: feed.entries.into_iter().map(raw_item_from).collect(),
    }
}

fn raw_item_from(entry: Entry) -> RawItem {
    let image = item_image(&entry.media);

    RawItem {
        link: entry
            .links
            .into_iter()
            .next()
            .map(|l| l.href)
            .unwrap_or_default(),
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        description: entry.summary.map(|s| s.content).unwrap_or_default(),
        content: entry.content.and_then(|c| c.body).unwrap_or_default(),
        image,
        // `updated` is never used as a fallback
        published: entry.published,
    }
}

/// First thumbnail, else first media content with an image MIME type.
fn item_image(media: &[MediaObject]) -> Option<RawImage> {
    let thumbnail = media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();

    thumbnail
        .or_else(|| {
            media
                .iter()
                .flat_map(|m| m.content.iter())
                .find(|c| {
                    c.content_type
                        .as_ref()
                        .is_some_and(|ct| ct.ty().as_str() == "image")
                })
                .and_then(|c| c.url.as_ref().map(|u| u.to_string()))
        })
        .map(|url| RawImage { url })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS_WITH_IMAGE: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
    <title>Example</title>
    <link>https://example.com</link>
    <description>An example feed</description>
    <image>
        <url>https://example.com/logo.png</url>
        <title>Example</title>
        <link>https://example.com</link>
    </image>
    <item>
        <title>First</title>
        <link>https://example.com/1</link>
        <description>First summary</description>
        <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
    </item>
    <item>
        <title>Second</title>
        <link>https://example.com/2</link>
        <content:encoded><![CDATA[<p>Second body</p>]]></content:encoded>
    </item>
</channel>
</rss>"#;

    const BARE_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Bare</title>
    <item><title>Only</title></item>
</channel></rss>"#;

    #[test]
    fn test_parse_feed_level_fields() {
        let feed = parse_feed(RSS_WITH_IMAGE.as_bytes()).unwrap();
        assert_eq!(feed.title, "Example");
        assert_eq!(feed.description, "An example feed");
        assert_eq!(
            feed.image,
            Some(RawImage {
                url: "https://example.com/logo.png".to_string()
            })
        );
        assert_eq!(feed.items.len(), 2);
    }

    #[test]
    fn test_parse_item_fields() {
        let feed = parse_feed(RSS_WITH_IMAGE.as_bytes()).unwrap();

        let first = &feed.items[0];
        assert_eq!(first.title, "First");
        assert_eq!(first.link, "https://example.com/1");
        assert_eq!(first.description, "First summary");
        assert!(first.published.is_some());

        let second = &feed.items[1];
        assert_eq!(second.title, "Second");
        assert!(second.description.is_empty());
        assert!(second.content.contains("Second body"));
        assert!(second.published.is_none());
    }

    #[test]
    fn test_parse_missing_fields_are_empty() {
        let feed = parse_feed(BARE_RSS.as_bytes()).unwrap();
        assert!(feed.description.is_empty());
        assert!(feed.image.is_none());

        let item = &feed.items[0];
        assert!(item.link.is_empty());
        assert!(item.description.is_empty());
        assert!(item.content.is_empty());
        assert!(item.image.is_none());
    }

    const RSS_WITH_MEDIA: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
<channel>
    <title>Media</title>
    <item>
        <title>Picture</title>
        <link>https://example.com/pic</link>
        <media:content url="https://example.com/pic.jpg" type="image/jpeg"/>
    </item>
    <item>
        <title>Podcast</title>
        <link>https://example.com/ep1</link>
        <media:content url="https://example.com/ep1.mp3" type="audio/mpeg"/>
    </item>
</channel>
</rss>"#;

    const ATOM_WITH_ICON: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Icon only</title>
    <id>urn:uuid:60a76c80-d399-11d9-b93c-0003939e0af6</id>
    <updated>2024-01-02T00:00:00Z</updated>
    <icon>https://example.com/favicon.ico</icon>
</feed>"#;

    #[test]
    fn test_parse_item_image_from_image_media_content() {
        let feed = parse_feed(RSS_WITH_MEDIA.as_bytes()).unwrap();
        assert_eq!(
            feed.items[0].image,
            Some(RawImage {
                url: "https://example.com/pic.jpg".to_string()
            })
        );
    }

    #[test]
    fn test_parse_item_ignores_non_image_media_content() {
        let feed = parse_feed(RSS_WITH_MEDIA.as_bytes()).unwrap();
        assert_eq!(feed.items[1].image, None);
    }

    #[test]
    fn test_parse_feed_image_falls_back_to_icon() {
        let feed = parse_feed(ATOM_WITH_ICON.as_bytes()).unwrap();
        assert_eq!(feed.title, "Icon only");
        assert_eq!(
            feed.image,
            Some(RawImage {
                url: "https://example.com/favicon.ico".to_string()
            })
        );
    }

    #[test]
    fn test_parse_invalid_xml() {
        let result = parse_feed(b"<not valid xml");
        assert!(matches!(result, Err(ParseError::Parse(_))));
    }

    #[tokio::test]
    async fn test_http_parser_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(RSS_WITH_IMAGE)
                    .insert_header("Content-Type", "application/xml"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let parser = HttpFeedParser::new(reqwest::Client::new());
        let feed = parser
            .parse(&format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(feed.title, "Example");
        assert_eq!(feed.items.len(), 2);
    }

    #[tokio::test]
    async fn test_http_parser_404_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let parser = HttpFeedParser::new(reqwest::Client::new());
        let result = parser.parse(&format!("{}/feed", mock_server.uri())).await;
        match result {
            Err(ParseError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_parser_500_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let parser = HttpFeedParser::new(reqwest::Client::new());
        let result = parser.parse(&format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(ParseError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_http_parser_rejects_oversized_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(2048)))
            .mount(&mock_server)
            .await;

        let parser = HttpFeedParser::new(reqwest::Client::new()).with_max_feed_size(1024);
        let result = parser.parse(&format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(ParseError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_http_parser_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(BARE_RSS)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&mock_server)
            .await;

        let parser = HttpFeedParser::new(reqwest::Client::new())
            .with_fetch_timeout(Duration::from_millis(100));
        let result = parser.parse(&format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(ParseError::Timeout)));
    }

    #[tokio::test]
    async fn test_http_parser_times_out_on_slow_body() {
        use tokio::io::AsyncWriteExt;

        // Headers arrive at once, the body never finishes
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n<rss")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let parser = HttpFeedParser::new(reqwest::Client::new())
            .with_fetch_timeout(Duration::from_millis(200));
        let result = parser.parse(&format!("http://{}/feed", addr)).await;
        assert!(matches!(result, Err(ParseError::Timeout)));

        server.abort();
    }

    #[tokio::test]
    async fn test_http_parser_malformed_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<not valid xml"))
            .mount(&mock_server)
            .await;

        let parser = HttpFeedParser::new(reqwest::Client::new());
        let result = parser.parse(&format!("{}/feed", mock_server.uri())).await;
        assert!(matches!(result, Err(ParseError::Parse(_))));
    }

    #[tokio::test]
    async fn test_http_parser_unreachable_host() {
        let parser = HttpFeedParser::new(reqwest::Client::new());
        let result = parser.parse("http://127.0.0.1:1/feed").await;
        assert!(matches!(result, Err(ParseError::Network(_))));
    }
}
