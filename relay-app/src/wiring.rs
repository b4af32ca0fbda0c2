use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use relay_config::{RelayConfig, SourceSpec};
use relay_llm::build_translator;
use relay_pipeline::{Pipeline, PipelineSettings};
use relay_publish::WordPressPublisher;
use relay_social::twitter::{Endpoint, SourceAdapter};
use relay_store::HistoryStore;

/// Endpoints in configured order; that order is the fallback order.
pub fn build_source(cfg: &RelayConfig) -> relay_common::Result<SourceAdapter> {
    let timeout = Duration::from_secs(cfg.fetch.timeout_secs.max(1));
    let endpoints = cfg
        .sources
        .iter()
        .map(|source| match source {
            SourceSpec::Mirror { base_url } => Endpoint::mirror(base_url, timeout),
            SourceSpec::Timeline {
                base_url,
                path,
                query,
                headers,
            } => Endpoint::timeline(
                base_url,
                path,
                query.iter().map(|q| (q.name.clone(), q.value.clone())).collect(),
                headers.iter().map(|h| (h.name.clone(), h.value.clone())).collect(),
                timeout,
            ),
            SourceSpec::Actor {
                actor_id,
                token,
                base_url,
            } => Endpoint::actor(base_url, actor_id, token, timeout),
        })
        .collect::<relay_common::Result<Vec<_>>>()?;
    Ok(SourceAdapter::new(endpoints))
}

pub async fn build_pipeline(cfg: &RelayConfig) -> Result<Pipeline> {
    let source = build_source(cfg)?;
    let translator = build_translator(&cfg.translator)?;
    let publisher = WordPressPublisher::from_config(
        &cfg.publisher,
        Duration::from_secs(cfg.fetch.timeout_secs.max(1)),
    )?;
    let store = HistoryStore::load(&cfg.store.path).await;

    tracing::info!(
        event = "app.wired",
        endpoints = ?source.endpoints().iter().map(Endpoint::label).collect::<Vec<_>>(),
        language = translator.target_language(),
        history = store.len()
    );

    Ok(Pipeline::new(
        source,
        translator,
        Arc::new(publisher),
        store,
        PipelineSettings {
            limit: cfg.fetch.limit,
            account_delay: Duration::from_millis(cfg.fetch.account_delay_ms),
            status_domain: cfg.fetch.status_domain.clone(),
        },
    ))
}

/// CLI accounts win over configured ones. Handles are trimmed, stripped of a
/// leading `@` and deduplicated in order.
pub fn accounts_to_run(cli: &[String], cfg: &RelayConfig) -> Vec<String> {
    let chosen = if cli.is_empty() { cfg.accounts.as_slice() } else { cli };
    let mut out: Vec<String> = Vec::new();
    for raw in chosen {
        let handle = raw.trim().trim_start_matches('@');
        if !handle.is_empty() && !out.iter().any(|h| h.eq_ignore_ascii_case(handle)) {
            out.push(handle.to_string());
        }
    }
    out
}
