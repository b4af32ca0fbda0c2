use std::time::Duration;

use async_trait::async_trait;
use relay_common::{RelayError, Result};
use relay_config::PublisherConfig;
use relay_http::{Auth, HttpClient, RequestOpts};
use relay_social::twitter::NormalizedPost;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

use crate::compose::{compose_content, truncate_title};
use crate::{Published, Publisher};

#[derive(Debug, Deserialize)]
struct MediaResponse {
    id: u64,
    source_url: String,
}

#[derive(Debug, Deserialize)]
struct PostResponse {
    id: Option<u64>,
    link: Option<String>,
}

/// An uploaded featured image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub id: u64,
    pub source_url: String,
}

/// WordPress REST publisher authenticated with an application password.
pub struct WordPressPublisher {
    http: HttpClient,
    username: String,
    app_password: String,
    status: String,
    category: u64,
    title_chars: usize,
    attribution_label: String,
}

impl WordPressPublisher {
    pub fn from_config(cfg: &PublisherConfig, timeout: Duration) -> Result<Self> {
        let http = HttpClient::new(&cfg.base_url)
            .map_err(|e| RelayError::config(format!("publisher.base_url: {e}")))?
            .with_timeout(timeout)
            .with_retries(cfg.retries);
        Ok(Self {
            http,
            username: cfg.username.clone(),
            app_password: cfg.app_password.clone(),
            status: cfg.status.clone(),
            category: cfg.category,
            title_chars: cfg.title_chars.max(1),
            attribution_label: cfg.attribution_label.clone(),
        })
    }

    fn auth(&self) -> Auth<'_> {
        Auth::Basic {
            username: &self.username,
            password: &self.app_password,
        }
    }

    /// Fetch `image_url` and re-host it on the site.
    pub async fn upload_image(&self, image_url: &str) -> Result<UploadedMedia> {
        let fail = |e: &dyn std::fmt::Display| {
            RelayError::MediaUploadFailed(format!("{image_url}: {e}"))
        };

        let image = self
            .http
            .get_raw(
                image_url,
                RequestOpts {
                    allow_absolute: true,
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| fail(&e))?;
        if image.body.is_empty() {
            return Err(fail(&"empty image body"));
        }

        let content_type = image
            .content_type()
            .filter(|ct| ct.starts_with("image/"))
            .map(str::to_string)
            .unwrap_or_else(|| content_type_for(image_url).to_string());
        let filename = upload_filename(image_url, &content_type);

        let mut headers = HeaderMap::new();
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
            .map_err(|e| fail(&e))?;
        headers.insert(CONTENT_DISPOSITION, disposition);

        let media: MediaResponse = self
            .http
            .post_bytes(
                "media",
                image.body,
                &content_type,
                RequestOpts {
                    auth: Some(self.auth()),
                    headers: Some(headers),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| fail(&e))?;

        Ok(UploadedMedia {
            id: media.id,
            source_url: media.source_url,
        })
    }
}

#[async_trait]
impl Publisher for WordPressPublisher {
    async fn publish(&self, post: &NormalizedPost, translated: &str) -> Result<Published> {
        let media = match post.media_urls.first() {
            Some(url) => match self.upload_image(url).await {
                Ok(m) => Some(m),
                Err(e) => {
                    warn!(event = "publish.media.degraded", id = %post.id, error = %e);
                    None
                }
            },
            None => None,
        };

        let content = compose_content(
            media.as_ref().map(|m| m.source_url.as_str()),
            translated,
            Some(post.permalink.as_str()),
            &self.attribution_label,
        );
        let mut body = json!({
            "title": truncate_title(translated, self.title_chars),
            "content": content,
            "status": self.status,
            "categories": [self.category],
        });
        if let Some(m) = &media {
            body["featured_media"] = Value::from(m.id);
        }

        let raw = self
            .http
            .post_json_raw(
                "posts",
                &body,
                RequestOpts {
                    auth: Some(self.auth()),
                    // a 5xx may arrive after the post was created
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| RelayError::PublishFailed(e.to_string()))?;

        if raw.status != StatusCode::CREATED {
            return Err(RelayError::PublishFailed(format!(
                "expected 201 Created, got {}",
                raw.status
            )));
        }

        let created: Option<PostResponse> = raw.json().ok();
        let published = Published {
            post_id: created.as_ref().and_then(|c| c.id),
            link: created.and_then(|c| c.link),
            featured_media: media.map(|m| m.id),
        };
        info!(
            event = "publish.post.created",
            id = %post.id,
            post_id = published.post_id,
            featured_media = published.featured_media
        );
        Ok(published)
    }
}

fn content_type_for(url: &str) -> &'static str {
    let lower = url.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if path.ends_with(".png") {
        "image/png"
    } else if path.ends_with(".gif") {
        "image/gif"
    } else if path.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Last path segment of the image URL, decoded once for mirrors that escape
/// the slash (`media%2Fabc.jpg`), with an extension matching the upload.
fn upload_filename(image_url: &str, content_type: &str) -> String {
    let segment = Url::parse(image_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .unwrap_or_default()
        .replace("%2F", "/")
        .replace("%2f", "/");
    let base: String = segment
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    let stem = base.rsplit_once('.').map_or(base.as_str(), |(stem, _)| stem);
    let stem = if stem.is_empty() { "image" } else { stem };
    format!("{stem}.{}", extension_for(content_type))
}
