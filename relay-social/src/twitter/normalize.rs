use std::collections::HashSet;

use relay_common::{RelayError, Result};

use super::types::{CandidateRecord, NormalizedPost};

/// Canonical status link for a post.
///
/// Without a handle the domain's handle-free `/i/web/status/` form is used.
pub fn status_url(domain: &str, author: Option<&str>, id: &str) -> String {
    match author.map(str::trim).filter(|a| !a.is_empty()) {
        Some(handle) => format!("https://{domain}/{handle}/status/{id}"),
        None => format!("https://{domain}/i/web/status/{id}"),
    }
}

/// Turn a candidate into a [`NormalizedPost`].
///
/// A candidate with no id, or whose resolved text is blank, is rejected with
/// [`RelayError::MalformedRecord`]. An upstream permalink is kept verbatim;
/// otherwise one is derived from `status_domain`.
pub fn normalize(candidate: CandidateRecord, status_domain: &str) -> Result<NormalizedPost> {
    let id = candidate
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RelayError::MalformedRecord("missing post id".into()))?
        .to_string();

    let text = candidate
        .text
        .resolve()
        .ok_or_else(|| RelayError::MalformedRecord(format!("post {id} has no text")))?
        .to_string();

    let author = candidate
        .author
        .as_deref()
        .map(|a| a.trim().trim_start_matches('@'))
        .unwrap_or_default()
        .to_string();

    let permalink = match candidate.permalink.as_deref().map(str::trim) {
        Some(link) if !link.is_empty() => link.to_string(),
        _ => status_url(status_domain, Some(&author), &id),
    };

    let mut seen = HashSet::new();
    let media_urls = candidate
        .media_urls
        .into_iter()
        .filter(|u| seen.insert(u.clone()))
        .collect();

    Ok(NormalizedPost {
        id,
        author,
        created_at: candidate.created_at,
        text,
        media_urls,
        permalink,
        engagement: candidate.engagement,
    })
}
