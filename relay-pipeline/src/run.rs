//! The run loop.
//!
//! Accounts are processed one at a time and posts one at a time. Every
//! failure is turned into a [`PostOutcome`] or an account-level error at the
//! point it happens, so one bad post or account never stops the batch. The
//! history is flushed exactly once, after the last account.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use relay_common::RelayError;
use relay_llm::Translator;
use relay_publish::Publisher;
use relay_social::twitter::{normalize, CandidateRecord, NormalizedPost, SourceAdapter};
use relay_store::{HistoryStore, PublishRecord};
use tracing::{info, warn};

use crate::report::{AccountReport, PostOutcome, PostReport, RunReport};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Posts requested per account.
    pub limit: usize,
    /// Pause between consecutive accounts.
    pub account_delay: Duration,
    /// Domain used for derived permalinks.
    pub status_domain: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            limit: 3,
            account_delay: Duration::ZERO,
            status_domain: "x.com".to_string(),
        }
    }
}

pub struct Pipeline {
    source: SourceAdapter,
    translator: Translator,
    publisher: Arc<dyn Publisher>,
    store: HistoryStore,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        source: SourceAdapter,
        translator: Translator,
        publisher: Arc<dyn Publisher>,
        store: HistoryStore,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            translator,
            publisher,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Process every account, then flush history once.
    pub async fn run(&mut self, accounts: &[String]) -> RunReport {
        let mut report = RunReport::default();
        // Ids already attempted this run, whatever their outcome.
        let mut attempted = HashSet::new();

        for (idx, account) in accounts.iter().enumerate() {
            if idx > 0 && !self.settings.account_delay.is_zero() {
                tokio::time::sleep(self.settings.account_delay).await;
            }
            let account_report = self.run_account(account, &mut attempted).await;
            report.accounts.push(account_report);
        }

        if let Err(e) = self.store.flush().await {
            warn!(event = "pipeline.flush.failed", error = %e);
            report.flush_error = Some(e.to_string());
        }

        info!(
            event = "pipeline.run.done",
            accounts = report.accounts.len(),
            recorded = report.count(PostOutcome::Recorded),
            skipped = report.count(PostOutcome::SkippedDuplicate),
            rejected = report.count(PostOutcome::Rejected),
            abandoned = report.count(PostOutcome::AbandonedTranslation),
            failed = report.count(PostOutcome::FailedPublish),
            unavailable = report.unavailable_accounts()
        );
        report
    }

    async fn run_account(&mut self, account: &str, attempted: &mut HashSet<String>) -> AccountReport {
        let mut report = AccountReport {
            account: account.to_string(),
            endpoint: None,
            error: None,
            posts: Vec::new(),
        };

        let fetched = match self.source.fetch(account, self.settings.limit).await {
            Ok(f) => f,
            Err(e) => {
                warn!(event = "pipeline.account.unavailable", account, error = %e);
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.endpoint = Some(fetched.endpoint);

        for candidate in fetched.records {
            let post_report = self.process(candidate, attempted).await;
            report.posts.push(post_report);
        }
        report
    }

    async fn process(&mut self, candidate: CandidateRecord, attempted: &mut HashSet<String>) -> PostReport {
        let post = match normalize(candidate, &self.settings.status_domain) {
            Ok(p) => p,
            Err(e) => {
                warn!(event = "pipeline.post.rejected", error = %e);
                return outcome(None, PostOutcome::Rejected, Some(e));
            }
        };
        let id = Some(post.id.clone());

        if self.store.contains(&post.id) || !attempted.insert(post.id.clone()) {
            info!(event = "pipeline.post.skipped", id = %post.id);
            return outcome(id, PostOutcome::SkippedDuplicate, None);
        }

        let translated = match self.translator.translate(&post.text).await {
            Ok(t) => t,
            Err(e) => {
                warn!(event = "pipeline.post.abandoned", id = %post.id, error = %e);
                return outcome(id, PostOutcome::AbandonedTranslation, Some(e));
            }
        };

        if let Err(e) = self.publisher.publish(&post, &translated).await {
            warn!(event = "pipeline.post.publish_failed", id = %post.id, error = %e);
            return outcome(id, PostOutcome::FailedPublish, Some(e));
        }

        self.store.append(record_for(post, translated));
        info!(event = "pipeline.post.recorded", id = ?id);
        outcome(id, PostOutcome::Recorded, None)
    }
}

fn outcome(id: Option<String>, outcome: PostOutcome, error: Option<RelayError>) -> PostReport {
    PostReport {
        id,
        outcome,
        detail: error.map(|e| e.to_string()),
    }
}

fn record_for(post: NormalizedPost, translated: String) -> PublishRecord {
    PublishRecord {
        id: post.id,
        username: (!post.author.is_empty()).then_some(post.author),
        date: post.created_at,
        original: post.text,
        translated,
        images: post.media_urls,
        tweet_url: post.permalink,
    }
}
