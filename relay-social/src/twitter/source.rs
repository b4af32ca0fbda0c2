//! Ordered-endpoint acquisition of recent posts for one account.
//!
//! Endpoints are tried strictly in configured order. The first one that
//! answers *and* yields at least one candidate carrying an id and text wins;
//! nothing is merged across endpoints. Each endpoint gets exactly one request
//! per fetch.

use std::borrow::Cow;
use std::time::Duration;

use relay_common::{RelayError, Result};
use relay_http::{Auth, HttpClient, HttpError, RequestOpts};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::extract::extract;
use super::types::{CandidateRecord, RawPayload};

#[derive(Debug, Clone)]
enum EndpointKind {
    /// `GET <base>/<account>` returning an HTML timeline.
    Mirror,
    /// `GET <base>/<path>` returning a JSON timeline. `{account}` and
    /// `{limit}` are substituted in the path, query values and header values.
    Timeline {
        path: String,
        query: Vec<(String, String)>,
        headers: Vec<(HeaderName, String)>,
    },
    /// Synchronous scraping-actor run returning dataset items.
    Actor { actor_id: String, token: String },
}

#[derive(Debug, Clone)]
pub struct Endpoint {
    label: String,
    http: HttpClient,
    kind: EndpointKind,
}

fn client(base_url: &str, timeout: Duration) -> Result<HttpClient> {
    HttpClient::new(base_url)
        .map(|c| c.with_timeout(timeout))
        .map_err(|e| RelayError::config(format!("source base url {base_url}: {e}")))
}

fn host_of(http: &HttpClient) -> String {
    http.base().host_str().unwrap_or("unknown").to_string()
}

fn render(template: &str, account: &str, limit: usize) -> String {
    template
        .replace("{account}", account)
        .replace("{limit}", &limit.to_string())
}

impl Endpoint {
    pub fn mirror(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = client(base_url, timeout)?;
        Ok(Self {
            label: format!("mirror:{}", host_of(&http)),
            http,
            kind: EndpointKind::Mirror,
        })
    }

    pub fn timeline(
        base_url: &str,
        path: &str,
        query: Vec<(String, String)>,
        headers: Vec<(String, String)>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = client(base_url, timeout)?;
        let headers = headers
            .into_iter()
            .map(|(name, value)| {
                HeaderName::from_bytes(name.as_bytes())
                    .map(|n| (n, value))
                    .map_err(|e| RelayError::config(format!("header name {name:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            label: format!("timeline:{}", host_of(&http)),
            http,
            kind: EndpointKind::Timeline {
                path: path.trim_start_matches('/').to_string(),
                query,
                headers,
            },
        })
    }

    pub fn actor(base_url: &str, actor_id: &str, token: &str, timeout: Duration) -> Result<Self> {
        if actor_id.trim().is_empty() {
            return Err(RelayError::config("actor source needs an actor_id"));
        }
        Ok(Self {
            label: format!("actor:{actor_id}"),
            http: client(base_url, timeout)?,
            kind: EndpointKind::Actor {
                actor_id: actor_id.trim().to_string(),
                token: token.to_string(),
            },
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// One request, no retries.
    async fn request(&self, account: &str, limit: usize) -> std::result::Result<RawPayload, HttpError> {
        let opts = RequestOpts {
            retries: Some(0),
            ..Default::default()
        };
        match &self.kind {
            EndpointKind::Mirror => {
                let html = self.http.get_text(account, opts).await?;
                let source = self.http.base().join(account).map_err(|e| HttpError::Url(e.to_string()))?;
                Ok(RawPayload::Document { source, html })
            }
            EndpointKind::Timeline {
                path,
                query,
                headers,
            } => {
                let path = render(path, account, limit);
                let mut header_map = HeaderMap::new();
                for (name, value) in headers {
                    let value = HeaderValue::from_str(&render(value, account, limit))
                        .map_err(|e| HttpError::Build(format!("header {name}: {e}")))?;
                    header_map.insert(name.clone(), value);
                }
                let query = query
                    .iter()
                    .map(|(k, v)| (k.as_str(), Cow::Owned(render(v, account, limit))))
                    .collect();
                let body: Value = self
                    .http
                    .get_json(
                        &path,
                        RequestOpts {
                            headers: Some(header_map),
                            query: Some(query),
                            ..opts
                        },
                    )
                    .await?;
                let source = self.http.base().join(&path).map_err(|e| HttpError::Url(e.to_string()))?;
                Ok(RawPayload::Json { source, body })
            }
            EndpointKind::Actor { actor_id, token } => {
                let path = format!("acts/{actor_id}/run-sync-get-dataset-items");
                let input = json!({ "twitterHandles": [account], "maxItems": limit });
                let body: Value = self
                    .http
                    .post_json(
                        &path,
                        &input,
                        RequestOpts {
                            auth: Some(Auth::Query {
                                name: "token",
                                value: Cow::Borrowed(token.as_str()),
                            }),
                            ..opts
                        },
                    )
                    .await?;
                let source = self.http.base().join(&path).map_err(|e| HttpError::Url(e.to_string()))?;
                Ok(RawPayload::Json { source, body })
            }
        }
    }
}

/// Candidates from the endpoint that satisfied a fetch.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub endpoint: String,
    pub records: Vec<CandidateRecord>,
}

#[derive(Debug, Clone)]
pub struct SourceAdapter {
    endpoints: Vec<Endpoint>,
}

impl SourceAdapter {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Up to `limit` candidates for `account`, newest first as served.
    ///
    /// Fails with [`RelayError::SourceUnavailable`] only after every endpoint
    /// either errored or produced nothing. Candidates without an author
    /// inherit the requested account.
    pub async fn fetch(&self, account: &str, limit: usize) -> Result<Fetched> {
        let account = account.trim().trim_start_matches('@');
        let mut failures = Vec::new();

        for endpoint in &self.endpoints {
            let payload = match endpoint.request(account, limit).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(
                        event = "source.endpoint.failed",
                        account,
                        endpoint = endpoint.label(),
                        error = %e
                    );
                    failures.push(format!("{}: {e}", endpoint.label()));
                    continue;
                }
            };

            let mut records = extract(&payload);
            if !records.iter().any(CandidateRecord::is_usable) {
                warn!(
                    event = "source.endpoint.empty",
                    account,
                    endpoint = endpoint.label(),
                    url = %payload.source(),
                    candidates = records.len()
                );
                failures.push(format!("{}: no posts found", endpoint.label()));
                continue;
            }

            records.truncate(limit);
            for r in &mut records {
                if r.author.as_deref().is_none_or(|a| a.trim().is_empty()) {
                    r.author = Some(account.to_string());
                }
            }
            info!(
                event = "source.endpoint.ok",
                account,
                endpoint = endpoint.label(),
                count = records.len()
            );
            return Ok(Fetched {
                endpoint: endpoint.label().to_string(),
                records,
            });
        }

        if failures.is_empty() {
            failures.push("no endpoints configured".to_string());
        }
        Err(RelayError::source_unavailable(account, failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_placeholders() {
        assert_eq!(render("u/{account}?n={limit}", "alice", 3), "u/alice?n=3");
        assert_eq!(render("static", "alice", 3), "static");
    }

    #[test]
    fn bad_header_names_are_config_errors() {
        let err = Endpoint::timeline(
            "https://api.example.com",
            "tweets",
            vec![],
            vec![("bad header".into(), "v".into())],
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn labels_name_the_host() {
        let e = Endpoint::mirror("https://nitter.example.net", Duration::from_secs(5)).unwrap();
        assert_eq!(e.label(), "mirror:nitter.example.net");
        let a = Endpoint::actor("https://api.apify.com/v2", "apidojo~tweet-scraper", "t", Duration::from_secs(5)).unwrap();
        assert_eq!(a.label(), "actor:apidojo~tweet-scraper");
    }

    #[tokio::test]
    async fn no_endpoints_is_unavailable() {
        let err = SourceAdapter::new(vec![]).fetch("alice", 3).await.unwrap_err();
        assert!(matches!(err, RelayError::SourceUnavailable { .. }));
    }
}
