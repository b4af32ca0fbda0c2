//! Loader for relay configuration with YAML + environment overlays.
//!
//! Sources are merged in order: YAML file(s) or inline YAML, then
//! `RELAY__`-prefixed environment variables (`RELAY__FETCH__LIMIT=5`), then
//! `${VAR}` placeholders inside any string are expanded from the process
//! environment. Credentials normally arrive through that last step, e.g.
//! `auth_token: "${GEMINI_API_KEY}"`.
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum RelayConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    pub version: Option<String>,
    /// Account handles processed in order, one at a time.
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Ordered upstream endpoints; the first one yielding posts wins.
    pub sources: Vec<SourceSpec>,
    pub translator: TranslatorConfig,
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub account_delay_ms: u64,
    #[serde(default = "default_status_domain")]
    pub status_domain: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            timeout_secs: default_timeout_secs(),
            account_delay_ms: 0,
            status_domain: default_status_domain(),
        }
    }
}

/// One upstream endpoint. The tag is `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSpec {
    /// HTML front-end mirror: `GET <base_url>/<account>`.
    Mirror { base_url: String },
    /// JSON timeline API. `{account}`/`{limit}` are rendered in `path`,
    /// query values and header values.
    Timeline {
        base_url: String,
        #[serde(default)]
        path: String,
        #[serde(default)]
        query: Vec<NameValue>,
        #[serde(default)]
        headers: Vec<NameValue>,
    },
    /// Scraping actor run synchronously; results come back in one response.
    Actor {
        actor_id: String,
        #[serde(deserialize_with = "lenient_string")]
        token: String,
        #[serde(default = "default_actor_base_url")]
        base_url: String,
    },
}

/// Kept as a list of pairs rather than a map so names keep their case.
#[derive(Debug, Clone, Deserialize)]
pub struct NameValue {
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_target_language")]
    pub target_language: String,
    #[serde(flatten)]
    pub provider: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Gemini {
        model: String,
        #[serde(deserialize_with = "lenient_string")]
        auth_token: String,
        #[serde(default = "default_gemini_endpoint")]
        endpoint: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
    Openai {
        model: String,
        #[serde(deserialize_with = "lenient_string")]
        auth_token: String,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
    /// REST root, e.g. `https://blog.example.com/wp-json/wp/v2/`.
    pub base_url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(deserialize_with = "lenient_string")]
    pub app_password: String,
    #[serde(default = "default_post_status")]
    pub status: String,
    pub category: u64,
    #[serde(default = "default_title_chars")]
    pub title_chars: usize,
    #[serde(default = "default_attribution_label")]
    pub attribution_label: String,
    /// Retry budget for the media upload. Creating the post is never retried.
    #[serde(default)]
    pub retries: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub stderr: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            dir: None,
            stderr: true,
            filter: default_log_filter(),
        }
    }
}

impl RelayConfig {
    /// Reject configurations that could never publish anything.
    pub fn validate(&self) -> Result<(), RelayConfigError> {
        if self.sources.is_empty() {
            return Err(RelayConfigError::Invalid(
                "at least one entry under `sources` is required".into(),
            ));
        }
        if self.fetch.limit == 0 {
            return Err(RelayConfigError::Invalid(
                "`fetch.limit` must be at least 1".into(),
            ));
        }
        if self.publisher.title_chars == 0 {
            return Err(RelayConfigError::Invalid(
                "`publisher.title_chars` must be at least 1".into(),
            ));
        }
        if let Some(blank) = self.accounts.iter().find(|a| a.trim().is_empty()) {
            return Err(RelayConfigError::Invalid(format!(
                "blank account handle {blank:?}"
            )));
        }
        Ok(())
    }
}

fn default_limit() -> usize {
    3
}
fn default_timeout_secs() -> u64 {
    20
}
fn default_status_domain() -> String {
    "x.com".into()
}
fn default_actor_base_url() -> String {
    "https://api.apify.com/v2".into()
}
fn default_target_language() -> String {
    "Malay (Bahasa Melayu)".into()
}
fn default_gemini_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".into()
}
fn default_post_status() -> String {
    "publish".into()
}
fn default_title_chars() -> usize {
    60
}
fn default_attribution_label() -> String {
    "Lihat tweet asal".into()
}
fn default_store_path() -> PathBuf {
    PathBuf::from("results.json")
}
fn default_log_format() -> String {
    "text".into()
}
fn default_log_filter() -> String {
    "info".into()
}
fn default_true() -> bool {
    true
}

/// Env values are parsed, so a numeric-looking token arrives as a number.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct RelayConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for RelayConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayConfigLoader {
    /// Start from nothing but `RELAY__` environment overrides.
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent (env-only deployments).
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use relay_config::{RelayConfigLoader, SourceSpec};
    ///
    /// let cfg = RelayConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// accounts: [codeglitch]
    /// sources:
    ///   - kind: mirror
    ///     base_url: https://nitter.net
    /// translator:
    ///   provider: gemini
    ///   model: gemini-1.5-flash
    ///   auth_token: dummy
    /// publisher:
    ///   base_url: https://blog.example.com/wp-json/wp/v2/
    ///   username: editor
    ///   app_password: secret
    ///   category: 4
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.accounts, vec!["codeglitch"]);
    /// assert!(matches!(cfg.sources[0], SourceSpec::Mirror { .. }));
    /// assert_eq!(cfg.fetch.limit, 3);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder, apply env overrides and `${VAR}` expansion, and
    /// deserialize into [`RelayConfig`].
    pub fn load(self) -> Result<RelayConfig, RelayConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("RELAY")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("accounts"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: RelayConfig = serde_json::from_value(v)
            .map_err(|e| RelayConfigError::Load(ConfigError::Message(e.to_string())))?;
        typed.validate()?;
        Ok(typed)
    }
}
