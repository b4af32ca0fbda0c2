use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// An upstream response body, tagged by how it must be read.
#[derive(Debug, Clone)]
pub enum RawPayload {
    /// Rendered HTML timeline from a mirror front-end.
    Document { source: Url, html: String },
    /// Structured JSON from a timeline API or a scraping actor.
    Json { source: Url, body: Value },
}

impl RawPayload {
    pub fn source(&self) -> &Url {
        match self {
            RawPayload::Document { source, .. } | RawPayload::Json { source, .. } => source,
        }
    }
}

/// Every place a post's text may live, in priority order.
///
/// Extractors fill what they find; [`TextSources::resolve`] picks the winner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSources {
    /// Long-form ("note") body.
    pub note: Option<String>,
    /// Full text of the post itself.
    pub primary: Option<String>,
    /// Text of the reposted original, when this post is a repost.
    pub reposted: Option<String>,
    /// Text of the quoted post.
    pub quoted: Option<String>,
    /// Legacy truncated text.
    pub plain: Option<String>,
}

impl TextSources {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            primary: Some(text.into()),
            ..Default::default()
        }
    }

    /// First non-blank candidate, trimmed.
    pub fn resolve(&self) -> Option<&str> {
        [
            &self.note,
            &self.primary,
            &self.reposted,
            &self.quoted,
            &self.plain,
        ]
        .into_iter()
        .filter_map(|t| t.as_deref())
        .map(str::trim)
        .find(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: Option<u64>,
    pub reposts: Option<u64>,
    pub replies: Option<u64>,
}

impl Engagement {
    pub fn is_empty(&self) -> bool {
        self.likes.is_none() && self.reposts.is_none() && self.replies.is_none()
    }
}

/// A loosely populated post as pulled from one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub id: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<String>,
    pub text: TextSources,
    pub media_urls: Vec<String>,
    pub permalink: Option<String>,
    pub engagement: Option<Engagement>,
}

impl CandidateRecord {
    /// Carries both an id and resolvable text, so normalization can accept it.
    pub fn is_usable(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty()) && self.text.resolve().is_some()
    }
}

/// Canonical post handed to translation and publishing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPost {
    pub id: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub text: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub permalink: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement: Option<Engagement>,
}
