//! Provider-agnostic LLM access and the post [`translate::Translator`].
//!
//! This crate exposes a common [`traits::LlmClient`] interface with Gemini and
//! OpenAI implementations, and builds the configured one from a
//! [`relay_config::LlmConfig`].
//!
//! # Examples
//! ```no_run
//! use relay_config::LlmConfig;
//! use relay_llm::build_llm_client;
//!
//! let cfg = LlmConfig::Gemini {
//!     model: "gemini-1.5-flash".into(),
//!     auth_token: "key".into(),
//!     endpoint: relay_llm::gemini::GEMINI_BASE_URL.into(),
//!     temperature: None,
//!     max_tokens: None,
//! };
//! let client = build_llm_client(&cfg).unwrap();
//! assert_eq!(client.model_name(), "gemini-1.5-flash");
//! ```
pub mod gemini;
pub mod openai;
pub mod traits;
pub mod translate;

use gemini::GeminiClient;
use openai::OpenAiClient;
use relay_common::RelayError;
use relay_config::LlmConfig;
use std::sync::Arc;
use traits::LlmClient;

pub use translate::Translator;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Construct the client named by `config`.
pub fn build_llm_client(config: &LlmConfig) -> relay_common::Result<Arc<dyn LlmClient>> {
    match config {
        LlmConfig::Gemini {
            model,
            auth_token,
            endpoint,
            ..
        } => {
            let model = non_empty_or(model, DEFAULT_GEMINI_MODEL);
            let endpoint = non_empty_or(endpoint, gemini::GEMINI_BASE_URL);
            let client = GeminiClient::with_base_url(&endpoint, auth_token.clone(), model)?;
            Ok(Arc::new(client))
        }
        LlmConfig::Openai {
            model,
            auth_token,
            endpoint,
            ..
        } => {
            let model = non_empty_or(model, DEFAULT_OPENAI_MODEL);
            let endpoint = non_empty_or(endpoint, openai::OPENAI_API_BASE);
            let client = OpenAiClient::with_base_url(&endpoint, auth_token.clone(), model)?;
            Ok(Arc::new(client))
        }
    }
}

/// Build a [`Translator`] with the provider's sampling settings applied.
pub fn build_translator(
    config: &relay_config::TranslatorConfig,
) -> relay_common::Result<Translator> {
    let (temperature, max_tokens) = match &config.provider {
        LlmConfig::Gemini {
            temperature,
            max_tokens,
            ..
        }
        | LlmConfig::Openai {
            temperature,
            max_tokens,
            ..
        } => (*temperature, *max_tokens),
    };
    if config.target_language.trim().is_empty() {
        return Err(RelayError::config("translator.target_language is empty"));
    }
    let llm = build_llm_client(&config.provider)?;
    Ok(Translator::new(llm, config.target_language.trim()).with_sampling(temperature, max_tokens))
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let v = value.trim();
    if v.is_empty() { fallback } else { v }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_endpoint_and_model_fall_back_to_provider_defaults() {
        let gemini = build_llm_client(&LlmConfig::Gemini {
            model: " ".into(),
            auth_token: "k".into(),
            endpoint: String::new(),
            temperature: None,
            max_tokens: None,
        })
        .unwrap();
        assert_eq!(gemini.model_name(), DEFAULT_GEMINI_MODEL);

        let openai = build_llm_client(&LlmConfig::Openai {
            model: String::new(),
            auth_token: "k".into(),
            endpoint: "  ".into(),
            temperature: None,
            max_tokens: None,
        })
        .unwrap();
        assert_eq!(openai.model_name(), DEFAULT_OPENAI_MODEL);
    }
}
