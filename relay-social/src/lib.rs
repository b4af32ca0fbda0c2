//! Upstream acquisition and normalization for short social posts.
//!
//! The `twitter` module holds the whole ingest side of the pipeline: the
//! ordered-endpoint [`twitter::SourceAdapter`], the payload extractors for the
//! HTML mirror and JSON timeline shapes, and the normalizer producing the
//! canonical [`twitter::NormalizedPost`] the rest of the pipeline consumes.
pub mod twitter;
