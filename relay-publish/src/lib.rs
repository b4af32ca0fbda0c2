//! Remote publication of translated posts.
//!
//! [`Publisher`] is the seam the pipeline talks to; [`WordPressPublisher`] is
//! the REST implementation used in production.
pub mod compose;
pub mod wordpress;

use async_trait::async_trait;
use relay_common::Result;
use relay_social::twitter::NormalizedPost;

pub use wordpress::WordPressPublisher;

/// What the remote site reported for a created post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Published {
    pub post_id: Option<u64>,
    pub link: Option<String>,
    /// Set when the featured image upload went through.
    pub featured_media: Option<u64>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create one remote post. `Ok` means the site confirmed creation; an
    /// image problem alone never turns into `Err`.
    async fn publish(&self, post: &NormalizedPost, translated: &str) -> Result<Published>;
}
