use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Parser Output
// ============================================================================

/// An image reference attached to a feed or an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub url: String,
}

/// A feed exactly as the parser produced it, before normalization.
///
/// Empty strings stand for "not present in the document".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeed {
    pub title: String,
    pub description: String,
    pub image: Option<RawImage>,
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub link: String,
    pub title: String,
    pub description: String,
    /// Full content body, used as a fallback when `description` is empty
    pub content: String,
    pub image: Option<RawImage>,
    pub published: Option<DateTime<Utc>>,
}

// ============================================================================
// Normalized Output
// ============================================================================

/// Canonical feed shape returned to callers.
///
/// Optional fields are `None` when the source had nothing to offer; they are
/// never filled with empty-string placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFeed {
    /// The URL the caller asked for, not the final redirect target
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub items: Vec<NormalizedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// RFC 3339 publication timestamp
    pub date: Option<String>,
}

/// Successful feeds of a batch, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub feeds: Vec<NormalizedFeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub url: String,
    pub is_valid: bool,
}
