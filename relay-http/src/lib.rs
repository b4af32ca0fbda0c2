//! Minimal HTTP client with safe logging, bounded timeouts, and flexible auth.
//!
//! - Request options: headers, `Auth`, query params, timeout, retries
//! - JSON, text, and raw-byte helpers for both directions
//! - Redacts sensitive query params and never logs secret values
//! - Retries 429/5xx only when a caller opts in (`retries > 0`); the default
//!   budget is zero so a failed call is reported immediately
//! - Optional *raw* response logging, enabled through the log filter with
//!   `http.raw=trace`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), relay_http::HttpError> {
//! let client = relay_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", relay_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: `Auth::Bearer` values are sanitized before use, and logs only
//! ever include the auth kind (bearer/basic/query/none), not the secret.

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use uuid::Uuid;

const RAW_MAX_BODY: usize = 64 * 1024;
const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

fn raw_enabled() -> bool {
    tracing::enabled!(target: "http.raw", tracing::Level::TRACE)
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "apikey"
            | "token"
            | "secret"
            | "client_secret"
            | "bearer"
            | "password"
    )
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if key.eq_ignore_ascii_case("authorization") || is_secret_param(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use relay_http::Auth;
///
/// let basic = Auth::Basic { username: "editor", password: "app-pass" };
/// match basic {
///     Auth::Basic { username, .. } => assert_eq!(username, "editor"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Authorization: Basic base64(username:password)
    Basic {
        username: &'a str,
        password: &'a str,
    },
    /// Auth via query param
    Query {
        name: &'a str,
        value: Cow<'a, str>,
    },
    None,
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Basic { .. } => "basic",
            Auth::Query { .. } => "query",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use relay_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(20)),
///     auth: Some(Auth::Query {
///         name: "token",
///         value: Cow::Borrowed("demo"),
///     }),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 20);
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
    /// If true and `path` is an absolute URL, use it as-is (ignore base).
    pub allow_absolute: bool,
}

/// A successful (2xx) response with its body fully read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub request_id: String,
}

impl RawResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_slice::<T>(&self.body).map_err(|e| {
            let snippet = snip_body(&self.body);
            tracing::warn!(
                req_id=%self.request_id,
                serde_line=%e.line(),
                serde_col=%e.column(),
                serde_err=%e,
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }
}

enum Payload<'b> {
    Empty,
    Json(Vec<u8>),
    Bytes { data: Bytes, content_type: &'b str },
}

impl Payload<'_> {
    fn len(&self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Json(b) => b.len(),
            Payload::Bytes { data, .. } => data.len(),
        }
    }
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// The base path always ends with `/` so relative paths extend it rather
    /// than replacing its last segment.
    ///
    /// ```no_run
    /// use relay_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://blog.example.com/wp-json/wp/v2")?;
    /// assert_eq!(client.base().as_str(), "https://blog.example.com/wp-json/wp/v2/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(20));
    /// assert_eq!(client.max_retries, 0);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let mut base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(20),
            max_retries: 0,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.get_raw(path, opts).await?.json()
    }

    /// GET a text body (HTML pages, plain responses).
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        Ok(self.get_raw(path, opts).await?.text())
    }

    /// GET the raw response, e.g. image bytes plus their content type.
    pub async fn get_raw(
        &self,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        self.send(Method::GET, path, Payload::Empty, opts).await
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json_raw(path, body, opts).await?.json()
    }

    /// POST a JSON body and hand back the raw response so callers can
    /// inspect the exact status code.
    pub async fn post_json_raw<B>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        self.send(Method::POST, path, Payload::Json(bytes), opts).await
    }

    /// POST an opaque body (file upload) and decode a JSON response.
    pub async fn post_bytes<T>(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.send(Method::POST, path, Payload::Bytes { data, content_type }, opts)
            .await?
            .json()
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn send(
        &self,
        method: Method,
        path: &str,
        payload: Payload<'_>,
        mut opts: RequestOpts<'_>,
    ) -> Result<RawResponse, HttpError> {
        let url = self.resolve(path, opts.allow_absolute)?;
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");

        // Query auth becomes a regular param so it survives retries.
        if let Some(Auth::Query { name, value }) = &opts.auth {
            let mut q = opts.query.take().unwrap_or_default();
            q.push((*name, value.clone()));
            opts.query = Some(q);
        }
        let bearer = match &opts.auth {
            Some(Auth::Bearer(tok)) => Some(sanitize_api_key(tok)?),
            _ => None,
        };

        let redacted_q: Vec<(String, String)> = opts
            .query
            .as_ref()
            .map(|q| {
                q.iter()
                    .map(|(k, v)| {
                        let shown = if is_secret_param(k) {
                            "<redacted>".to_string()
                        } else {
                            v.as_ref().to_string()
                        };
                        ((*k).to_string(), shown)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let req_id = Uuid::new_v4().simple().to_string();
        let mut attempt = 0usize;

        loop {
            let mut rb = self
                .inner
                .request(method.clone(), url.clone())
                .timeout(timeout);

            if let Some(q) = &opts.query {
                let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.query(&pairs);
            }

            rb = match &payload {
                Payload::Empty => rb,
                Payload::Json(bytes) => rb
                    .header(CONTENT_TYPE, "application/json")
                    .body(bytes.clone()),
                Payload::Bytes { data, content_type } => {
                    rb.header(CONTENT_TYPE, *content_type).body(data.clone())
                }
            };

            if let Some(hdrs) = &opts.headers {
                rb = rb.headers(hdrs.clone());
            }

            match &opts.auth {
                Some(Auth::Bearer(_)) => {
                    if let Some(tok) = &bearer {
                        rb = rb.bearer_auth(tok);
                    }
                }
                Some(Auth::Basic { username, password }) => {
                    rb = rb.basic_auth(username, Some(password));
                }
                Some(Auth::Query { .. }) | Some(Auth::None) | None => {}
            }

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
                query=?redacted_q,
                headers=?opts.headers.as_ref().map(redact_headers),
                timeout_ms=timeout.as_millis() as u64,
                auth_kind,
                body_len=payload.len(),
                "http.request.start"
            );

            let t0 = Instant::now();
            let sent = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let headers = resp.headers().clone();
                    resp.bytes().await.map(|body| (status, headers, body))
                }
                Err(err) => Err(err),
            };

            let (status, headers, body) = match sent {
                Ok(parts) => parts,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            timed_out=err.is_timeout(),
                            message=%message,
                            "http.retrying.network"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(
                        req_id=%req_id,
                        attempt,
                        timed_out=err.is_timeout(),
                        message=%message,
                        "http.network_error"
                    );
                    return Err(HttpError::Network(message));
                }
            };

            let dur_ms = t0.elapsed().as_millis() as u64;
            let upstream_id = headers
                .get("x-request-id")
                .or_else(|| headers.get("x-correlation-id"))
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();

            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=dur_ms,
                body_len=body.len(),
                x_request_id=%upstream_id,
                "http.response.headers"
            );

            if raw_enabled() {
                let mut snip = body.clone();
                let truncated = snip.len() > RAW_MAX_BODY;
                if truncated {
                    snip.truncate(RAW_MAX_BODY);
                }
                tracing::trace!(
                    target: "http.raw",
                    %req_id,
                    %status,
                    duration_ms=dur_ms,
                    headers=?redact_headers(&headers),
                    body=%String::from_utf8_lossy(&snip),
                    truncated
                );
            }

            if status.is_success() {
                return Ok(RawResponse {
                    status,
                    headers,
                    body,
                    request_id: req_id,
                });
            }

            let message = extract_error_message(&body);
            let snippet = snip_body(&body);
            let is_429 = status == StatusCode::TOO_MANY_REQUESTS;

            if (is_429 || status.is_server_error()) && attempt < max_retries {
                attempt += 1;
                let delay = retry_after_delay_secs(&headers)
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| {
                        let exp = backoff(attempt);
                        if is_429 {
                            exp.max(Duration::from_millis(1100))
                        } else {
                            exp
                        }
                    });
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    message=%message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%upstream_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id: upstream_id,
            });
        }
    }
}

// ==============================
// Helpers
// ==============================

fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(10) as u32;
    Duration::from_millis(200u64.saturating_mul(1 << shift))
}

/// Pull a human-readable message out of the error bodies we meet in practice:
/// `{"error":{"message":..}}`, `{"errors":[{"message"|"detail"|"title":..}]}`,
/// and WordPress-style `{"code":..,"message":..}`.
fn extract_error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct Nested {
        error: NestedDetail,
    }
    #[derive(Deserialize)]
    struct NestedDetail {
        message: String,
    }

    #[derive(Deserialize)]
    struct ErrorList {
        errors: Vec<Msg>,
    }

    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        title: String,
    }

    impl Msg {
        fn first_non_empty(self) -> Option<String> {
            [self.message, self.detail, self.title]
                .into_iter()
                .find(|s| !s.is_empty())
        }
    }

    if let Ok(env) = serde_json::from_slice::<Nested>(body) {
        return env.error.message;
    }
    if let Ok(list) = serde_json::from_slice::<ErrorList>(body) {
        if let Some(msg) = list.errors.into_iter().next().and_then(Msg::first_non_empty) {
            return msg;
        }
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        if let Some(msg) = m.first_non_empty() {
            return msg;
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() > 500 {
        let mut snip: String = text.chars().take(500).collect();
        snip.push_str("...");
        snip
    } else {
        text.into_owned()
    }
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }
    HeaderValue::from_str(&format!("Bearer {}", s))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}
