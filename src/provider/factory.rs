// PromptDeck: Provider factory

use super::{http::GeminiProvider, LLMProvider};
use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;

/// Create the generation provider from the loaded config.
///
/// API keys are not part of the provider; they are supplied per call.
pub fn create_provider(cfg: &Config) -> anyhow::Result<Arc<dyn LLMProvider>> {
    let gen = &cfg.generation;
    let api_base = if gen.api_base.is_empty() {
        "(default)"
    } else {
        gen.api_base.as_str()
    };

    tracing::info!(
        provider = "gemini",
        model = %gen.default_model,
        api_base = %api_base,
        "Creating generation provider"
    );

    let provider = GeminiProvider::new(
        gen.api_base.clone(),
        Duration::from_secs(gen.timeout_secs),
        gen.max_retries,
        Duration::from_millis(gen.retry_delay_ms),
    )?;

    Ok(Arc::new(provider))
}
