use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use relay_common::{RelayError, Result};
use relay_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ResponsesApiRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ResponsesApiResponse {
    model: Option<String>,
    #[serde(default)]
    output: Vec<ResponseMessage>,
    usage: Option<Usage>,
}

/// One element in the `output` array
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ResponseContent>,
}

/// One part of the message `content`
#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: Option<u32>,
}

impl OpenAiClient {
    /// Point at an OpenAI-compatible gateway instead of the public API.
    pub fn with_base_url(base_url: &str, api_key: String, model: String) -> Result<Self> {
        let client = HttpClient::new(base_url).map_err(http_to_relay)?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = ResponsesApiRequest {
            model: &self.model,
            input: prompt,
            instructions: system_prompt,
            max_output_tokens: max_tokens,
            temperature,
        };
        tracing::debug!(event = "llm.openai.request", model = %self.model);

        let resp: ResponsesApiResponse = self
            .client
            .post_json(
                "responses",
                &req,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await
            .map_err(http_to_relay)?;

        let text = resp
            .output
            .iter()
            .flat_map(|msg| &msg.content)
            .find(|c| c.kind == "output_text")
            .map(|c| c.text.clone())
            .ok_or_else(|| RelayError::Llm("no output_text in OpenAI response".into()))?;

        Ok(LlmResponse {
            text,
            model: resp.model,
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn http_to_relay(e: HttpError) -> RelayError {
    RelayError::Llm(format!("OpenAI request failed: {e}"))
}
