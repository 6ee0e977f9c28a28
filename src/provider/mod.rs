// PromptDeck: Text-generation provider abstraction

pub mod factory;
pub mod http;

use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// The remote text-generation capability.
///
/// Implementations may fail for any reason (network, auth, quota, malformed
/// response). Callers are expected to wrap every call in their own fallback.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate text for `prompt` with `model`, authenticating with `api_key`.
    async fn invoke(&self, prompt: &str, model: &str, api_key: &str) -> anyhow::Result<String>;

    /// Short provider name used in logs and status output.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Model catalogue
// ---------------------------------------------------------------------------

/// A selectable model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub label: &'static str,
}

/// Models offered to callers, newest first.
pub const GEMINI_MODELS: &[ModelInfo] = &[
    ModelInfo { id: "gemini-2.5-pro", label: "Gemini 2.5 Pro" },
    ModelInfo { id: "gemini-2.5-flash", label: "Gemini 2.5 Flash" },
    ModelInfo { id: "gemini-2.0-flash", label: "Gemini 2.0 Flash" },
    ModelInfo { id: "gemini-2.0-flash-lite", label: "Gemini 2.0 Flash-Lite" },
];

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Whether `id` is made only of `[A-Za-z0-9._-]`. Ids outside that set are
/// refused before they reach a request URL.
pub fn is_valid_model_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Look up a model by id.
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    GEMINI_MODELS.iter().find(|m| m.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_is_listed() {
        assert!(find_model(DEFAULT_MODEL).is_some());
        assert!(find_model("gpt-4").is_none());
    }

    #[test]
    fn test_model_id_charset() {
        assert!(GEMINI_MODELS.iter().all(|m| is_valid_model_id(m.id)));
        assert!(is_valid_model_id("gemini-exp_1.5"));
        assert!(!is_valid_model_id(""));
        assert!(!is_valid_model_id("../admin"));
        assert!(!is_valid_model_id("flash?key=1"));
        assert!(!is_valid_model_id("flash#x"));
    }
}
