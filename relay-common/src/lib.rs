//! Common types shared across the relay crates.
//!
//! This crate holds the error taxonomy every pipeline stage reports through,
//! and the observability helpers binaries and tests use to set up `tracing`.
//! It stays dependency-light so the leaf crates (`relay-social`,
//! `relay-store`, ...) can depend on it without pulling in HTTP or config.
//!
//! # Overview
//!
//! - [`RelayError`] and [`Result`]: failure kinds of the ingest → translate →
//!   publish pipeline. None of them is fatal to a run; the orchestrator turns
//!   each into a per-account or per-post outcome.
//! - [`observability`]: centralised tracing/logging initialisation.
//!
//! # Examples
//!
//! ```rust
//! use relay_common::RelayError;
//!
//! let err = RelayError::source_unavailable("codeglitch", "all 2 endpoints failed");
//! assert!(err.to_string().contains("@codeglitch"));
//! assert!(err.is_retryable());
//! ```
use std::fmt;

pub mod observability;

/// Error types used across the relay pipeline.
#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    /// Every configured endpoint failed or returned nothing for an account.
    #[error("Source unavailable for @{account}: {reason}")]
    SourceUnavailable { account: String, reason: String },

    /// A record lacked an id or text after extraction.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The translation call failed or returned no usable text.
    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    /// Fetching or uploading the featured image failed.
    #[error("Media upload failed: {0}")]
    MediaUploadFailed(String),

    /// The create-post call did not report the post as created.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// The persisted history could not be read back.
    #[error("History store unreadable: {0}")]
    StoreCorrupt(String),

    /// An LLM provider reported an error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn source_unavailable(account: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            account: account.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(message: impl fmt::Display) -> Self {
        Self::Config(message.to_string())
    }

    /// Whether the affected item stays unrecorded and is picked up again on
    /// the next run.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RelayError::SourceUnavailable { .. }
                | RelayError::TranslationFailed(_)
                | RelayError::PublishFailed(_)
                | RelayError::Llm(_)
        )
    }
}

/// Convenient alias for results that use [`RelayError`].
pub type Result<T> = std::result::Result<T, RelayError>;
