//! Twitter/X ingestion: endpoints, payload extraction, normalization.
//!
//! Data flows `SourceAdapter::fetch` → [`extract::extract`] →
//! [`normalize::normalize`]. Extraction is tolerant (missing fields are legal);
//! normalization is where a record without an id or text gets rejected.
pub mod extract;
pub mod html;
pub mod normalize;
pub mod source;
pub mod types;

pub use normalize::{normalize, status_url};
pub use source::{Endpoint, Fetched, SourceAdapter};
pub use types::{CandidateRecord, Engagement, NormalizedPost, RawPayload, TextSources};
