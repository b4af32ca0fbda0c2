use serde::Serialize;

/// Terminal state of one post within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostOutcome {
    Recorded,
    SkippedDuplicate,
    /// Dropped at normalization (no id or no text).
    Rejected,
    AbandonedTranslation,
    FailedPublish,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostReport {
    pub id: Option<String>,
    pub outcome: PostOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub account: String,
    /// Label of the endpoint that served this account.
    pub endpoint: Option<String>,
    /// Set when no endpoint produced posts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub posts: Vec<PostReport>,
}

impl AccountReport {
    pub fn count(&self, outcome: PostOutcome) -> usize {
        self.posts.iter().filter(|p| p.outcome == outcome).count()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub accounts: Vec<AccountReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_error: Option<String>,
}

impl RunReport {
    pub fn count(&self, outcome: PostOutcome) -> usize {
        self.accounts.iter().map(|a| a.count(outcome)).sum()
    }

    pub fn unavailable_accounts(&self) -> usize {
        self.accounts.iter().filter(|a| a.error.is_some()).count()
    }
}
