use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use relay_common::{RelayError, Result};
use relay_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    total_token_count: Option<u32>,
}

/// Google Gemini `generateContent` client.
///
/// The API key travels as the `key` query parameter.
pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn with_base_url(base_url: &str, api_key: String, model: String) -> Result<Self> {
        let http = HttpClient::new(base_url)
            .map_err(|e| RelayError::Llm(format!("HttpClient init failed: {e}")))?
            .with_timeout(Duration::from_secs(60));
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let generation_config = (max_tokens.is_some() || temperature.is_some()).then_some(
            GeminiGenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            },
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config,
            system_instruction: system_prompt.map(|s| GeminiContent {
                parts: vec![GeminiPart {
                    text: s.to_string(),
                }],
            }),
        };

        let path = format!("models/{}:generateContent", self.model);
        tracing::debug!(event = "llm.gemini.request", model = %self.model);

        let resp: GeminiResponse = self
            .http
            .post_json(
                &path,
                &request,
                RequestOpts {
                    auth: Some(Auth::Query {
                        name: "key",
                        value: Cow::Borrowed(self.api_key.as_str()),
                    }),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| RelayError::Llm(format!("Gemini request failed: {e}")))?;

        let candidate = resp
            .candidates
            .first()
            .ok_or_else(|| RelayError::Llm("No candidates returned from Gemini".into()))?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(RelayError::Llm(
                "Content blocked by Gemini safety filters".into(),
            ));
        }

        let text = candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone())
            .ok_or_else(|| RelayError::Llm("No content parts in Gemini response".into()))?;

        Ok(LlmResponse {
            text,
            model: Some(self.model.clone()),
            tokens_used: resp.usage_metadata.and_then(|u| u.total_token_count),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
