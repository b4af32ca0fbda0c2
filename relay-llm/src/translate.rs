//! Post translation on top of any [`LlmClient`].

use std::sync::Arc;

use relay_common::{RelayError, Result};
use tracing::{debug, warn};

use crate::traits::LlmClient;

pub const DEFAULT_TARGET_LANGUAGE: &str = "Malay (Bahasa Melayu)";

const SYSTEM_PROMPT: &str =
    "You translate social media posts. Reply with the translated text only, without commentary.";

/// Translates post text into one configured language.
///
/// Every failure, including an empty reply, surfaces as
/// [`RelayError::TranslationFailed`] so callers can abandon just that post.
#[derive(Clone)]
pub struct Translator {
    llm: Arc<dyn LlmClient>,
    target_language: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl Translator {
    pub fn new(llm: Arc<dyn LlmClient>, target_language: impl Into<String>) -> Self {
        Self {
            llm,
            target_language: target_language.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn prompt(&self, text: &str) -> String {
        format!(
            "Translate the following tweet into {} with a casual, local tone. \
             Keep all crypto terms (like wallet, futures, mining) in English:\n\n\"{}\"",
            self.target_language, text
        )
    }

    pub async fn translate(&self, text: &str) -> Result<String> {
        let response = self
            .llm
            .generate(
                &self.prompt(text),
                Some(SYSTEM_PROMPT),
                self.max_tokens,
                self.temperature,
            )
            .await
            .map_err(|e| {
                warn!(event = "translate.failed", model = self.llm.model_name(), error = %e);
                RelayError::TranslationFailed(e.to_string())
            })?;

        let translated = strip_wrapping_quotes(response.text.trim());
        if translated.is_empty() {
            warn!(event = "translate.empty", model = self.llm.model_name());
            return Err(RelayError::TranslationFailed(
                "model returned empty text".into(),
            ));
        }
        debug!(
            event = "translate.ok",
            model = self.llm.model_name(),
            tokens = response.tokens_used
        );
        Ok(translated.to_string())
    }
}

/// The prompt quotes the source text, and models often echo the quotes back.
fn strip_wrapping_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::trim)
        .unwrap_or(s)
}
