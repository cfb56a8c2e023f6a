//! Language detection and translation.
//!
//! [`Translator`] is what the pipelines hold. It wraps a [`TranslationEngine`]
//! and applies the failure policy: detection never fails (it degrades to
//! English), while translation errors always reach the caller.

use async_trait::async_trait;
use shared::DEFAULT_LANGUAGE;
use std::sync::Arc;

mod anthropic;

pub use anthropic::AnthropicEngine;

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("network error: {0}")]
    Network(String),

    #[error("engine error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed engine response: {0}")]
    Malformed(String),

    #[error("translation engine not configured")]
    Disabled,
}

/// Raw detection/translation backend.
#[async_trait]
pub trait TranslationEngine: Send + Sync {
    /// Best guess at the language of `text`, in whatever shape the engine returns.
    async fn detect_language(&self, text: &str) -> Result<String, TranslationError>;

    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError>;
}

/// Engine used when no API key is configured.
pub struct DisabledEngine;

#[async_trait]
impl TranslationEngine for DisabledEngine {
    async fn detect_language(&self, _text: &str) -> Result<String, TranslationError> {
        Ok(DEFAULT_LANGUAGE.to_string())
    }

    async fn translate(
        &self,
        _text: &str,
        _source: &str,
        _target: &str,
    ) -> Result<String, TranslationError> {
        Err(TranslationError::Disabled)
    }
}

/// Result of language detection. `failure` is set when the engine errored or
/// answered with something that is not a language code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub language: String,
    pub failure: Option<String>,
}

#[derive(Clone)]
pub struct Translator {
    engine: Arc<dyn TranslationEngine>,
}

impl Translator {
    pub fn new(engine: Arc<dyn TranslationEngine>) -> Self {
        Self { engine }
    }

    /// Detect the language of `text`. Always yields a two-letter code.
    pub async fn detect(&self, text: &str) -> Detection {
        match self.engine.detect_language(text).await {
            Ok(raw) => match normalize_language_code(&raw) {
                Some(language) => Detection { language, failure: None },
                None => {
                    tracing::warn!("Language detection returned {:?}, assuming English", raw);
                    Detection {
                        language: DEFAULT_LANGUAGE.to_string(),
                        failure: Some(format!("unrecognized language code: {:?}", raw)),
                    }
                }
            },
            Err(e) => {
                tracing::warn!("Language detection failed, assuming English: {}", e);
                Detection {
                    language: DEFAULT_LANGUAGE.to_string(),
                    failure: Some(e.to_string()),
                }
            }
        }
    }

    /// Translate `text`. Identity when `source == target`.
    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslationError> {
        if source == target {
            return Ok(text.to_string());
        }
        self.engine.translate(text, source, target).await
    }
}

/// Accept only a bare two-letter ISO 639-1 code (after trimming and lowercasing).
pub fn normalize_language_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_lowercase();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) {
        Some(code)
    } else {
        None
    }
}

/// English name for a language code, used in engine prompts.
pub fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "so" => "Somali",
        "ar" => "Arabic",
        "fr" => "French",
        "de" => "German",
        "zh" => "Chinese",
        "hi" => "Hindi",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "vi" => "Vietnamese",
        "th" => "Thai",
        "tr" => "Turkish",
        "pl" => "Polish",
        "it" => "Italian",
        "nl" => "Dutch",
        "sv" => "Swedish",
        "da" => "Danish",
        "no" => "Norwegian",
        "fi" => "Finnish",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;

    #[tokio::test]
    async fn test_detect_normalizes_engine_output() {
        let engine = FakeEngine::new().detect_with(" ES\n");
        let translator = Translator::new(Arc::new(engine));
        let detection = translator.detect("Necesito ayuda").await;
        assert_eq!(detection.language, "es");
        assert!(detection.failure.is_none());
    }

    #[tokio::test]
    async fn test_detect_coerces_unexpected_shape_to_english() {
        for raw in ["Spanish", "es-MX", "", "e5"] {
            let translator = Translator::new(Arc::new(FakeEngine::new().detect_with(raw)));
            let detection = translator.detect("hola").await;
            assert_eq!(detection.language, "en", "raw output {:?}", raw);
            assert!(detection.failure.is_some());
        }
    }

    #[tokio::test]
    async fn test_detect_falls_back_on_engine_failure() {
        let translator = Translator::new(Arc::new(FakeEngine::failing()));
        let detection = translator.detect("anything").await;
        assert_eq!(detection.language, "en");
        assert!(detection.failure.unwrap().contains("network"));
    }

    #[tokio::test]
    async fn test_translate_same_language_is_identity() {
        // A failing engine proves the engine is never consulted
        let translator = Translator::new(Arc::new(FakeEngine::failing()));
        let out = translator.translate("We can help at 3pm", "en", "en").await.unwrap();
        assert_eq!(out, "We can help at 3pm");
    }

    #[tokio::test]
    async fn test_translate_propagates_engine_errors() {
        let translator = Translator::new(Arc::new(FakeEngine::failing()));
        let err = translator.translate("hola", "es", "en").await.unwrap_err();
        assert!(matches!(err, TranslationError::Network(_)));
    }

    #[tokio::test]
    async fn test_disabled_engine() {
        let translator = Translator::new(Arc::new(DisabledEngine));
        assert_eq!(translator.detect("bonjour").await.language, "en");
        assert!(matches!(
            translator.translate("bonjour", "fr", "en").await,
            Err(TranslationError::Disabled)
        ));
    }

    #[test]
    fn test_language_names() {
        assert_eq!(language_name("so"), "Somali");
        assert_eq!(language_name("xx"), "xx");
    }
}
