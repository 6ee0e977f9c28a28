// PromptDeck: Generation client
//
// Resolves the API key, builds the prompt, calls the provider and falls back
// to a deterministic placeholder when no key is available or the call fails.
// `generate` never returns an error; failures only show up in logs and in the
// returned `GenerationSource`.

use crate::model::GenerationInput;
use crate::prompt::build_default_prompt;
use crate::provider::LLMProvider;
use crate::template;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trailer appended to every placeholder output.
pub const PLACEHOLDER_NOTICE: &str = "This is placeholder output. Set generation.api_key in the config file (or the GEMINI_API_KEY environment variable), or supply your own key, to use real generation.";

const DEFAULT_TONE: &str = "neutral";
const DEFAULT_LENGTH: &str = "medium";

// ---------------------------------------------------------------------------
// Request / outcome types
// ---------------------------------------------------------------------------

/// Everything needed for one generation.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub tool_name: &'a str,
    pub tool_description: &'a str,
    pub input: &'a GenerationInput,
    pub model: &'a str,
    pub caller_key: Option<&'a str>,
    pub custom_template: Option<&'a str>,
}

/// Why a placeholder was returned instead of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Neither a configured nor a caller key was available.
    NoKey,
    /// The provider did not answer within the configured bound.
    Timeout,
    /// The provider returned an error.
    Remote(String),
}

impl FallbackReason {
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::NoKey => "no_key",
            FallbackReason::Timeout => "timeout",
            FallbackReason::Remote(_) => "remote_error",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::NoKey => write!(f, "no API key available"),
            FallbackReason::Timeout => write!(f, "generation timed out"),
            FallbackReason::Remote(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationSource {
    Remote,
    Stub(FallbackReason),
}

/// Result of a provider call: text, or the reason to fall back.
#[derive(Debug)]
pub enum RemoteOutcome {
    Generated(String),
    Failed(FallbackReason),
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub source: GenerationSource,
    pub elapsed: Duration,
}

impl Generation {
    pub fn is_stub(&self) -> bool {
        matches!(self.source, GenerationSource::Stub(_))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct GenerationClient {
    provider: Arc<dyn LLMProvider>,
    configured_key: Option<String>,
    timeout: Duration,
}

impl GenerationClient {
    /// `configured_key` is the operator's key; it always wins over a caller key.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        configured_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let configured_key = configured_key.filter(|k| !k.trim().is_empty());
        Self {
            provider,
            configured_key,
            timeout,
        }
    }

    pub fn has_configured_key(&self) -> bool {
        self.configured_key.is_some()
    }

    /// Pick the key to use: configured first, then the caller's.
    pub fn resolve_key<'a>(&'a self, caller_key: Option<&'a str>) -> Option<&'a str> {
        self.configured_key
            .as_deref()
            .or_else(|| caller_key.map(str::trim).filter(|k| !k.is_empty()))
    }

    /// Generate text. Always yields non-empty text.
    pub async fn generate(&self, req: GenerationRequest<'_>) -> Generation {
        let started = Instant::now();

        let outcome = match self.resolve_key(req.caller_key) {
            Some(key) => {
                let prompt = compose_prompt(&req);
                self.invoke(&prompt, req.model, key).await
            }
            None => RemoteOutcome::Failed(FallbackReason::NoKey),
        };

        let (text, source) = match outcome {
            RemoteOutcome::Generated(text) => (text, GenerationSource::Remote),
            RemoteOutcome::Failed(reason) => {
                match &reason {
                    FallbackReason::NoKey => tracing::info!(
                        tool = %req.tool_name,
                        "No API key available, returning placeholder output"
                    ),
                    other => tracing::warn!(
                        tool = %req.tool_name,
                        model = %req.model,
                        reason = other.label(),
                        error = %other,
                        "Generation failed, falling back to placeholder output"
                    ),
                }
                (stub_text(req.tool_name, req.input), GenerationSource::Stub(reason))
            }
        };

        Generation {
            text,
            source,
            elapsed: started.elapsed(),
        }
    }

    async fn invoke(&self, prompt: &str, model: &str, key: &str) -> RemoteOutcome {
        tracing::debug!(
            provider = self.provider.name(),
            model = %model,
            prompt_len = prompt.len(),
            "Invoking generation provider"
        );

        match tokio::time::timeout(self.timeout, self.provider.invoke(prompt, model, key)).await {
            Ok(Ok(text)) if !text.is_empty() => RemoteOutcome::Generated(text),
            Ok(Ok(_)) => RemoteOutcome::Failed(FallbackReason::Remote(
                "provider returned empty text".to_string(),
            )),
            Ok(Err(e)) => RemoteOutcome::Failed(FallbackReason::Remote(format!("{:#}", e))),
            Err(_) => RemoteOutcome::Failed(FallbackReason::Timeout),
        }
    }
}

/// Build the prompt: the tool's custom template if set, else the default.
pub fn compose_prompt(req: &GenerationRequest<'_>) -> String {
    match req.custom_template.filter(|t| !t.trim().is_empty()) {
        Some(tpl) => template::render(tpl, &template_variables(req)),
        None => build_default_prompt(req.tool_name, req.tool_description, req.input),
    }
}

fn template_variables(req: &GenerationRequest<'_>) -> HashMap<&'static str, String> {
    let input = req.input;
    HashMap::from([
        ("toolName", req.tool_name.to_string()),
        ("description", req.tool_description.to_string()),
        ("title", input.title().unwrap_or_default().to_string()),
        ("text", input.text.clone()),
        ("tone", input.tone().unwrap_or(DEFAULT_TONE).to_string()),
        ("length", input.length().unwrap_or(DEFAULT_LENGTH).to_string()),
    ])
}

/// Deterministic placeholder built from the tool name and the raw input.
pub fn stub_text(tool_name: &str, input: &GenerationInput) -> String {
    let mut out = format!("[{}] generated text\n\n", tool_name);

    if let Some(title) = input.title() {
        out.push_str(&format!("Title: {}\n\n", title));
    }

    out.push_str(&format!("Input: {}\n\n", input.text));

    if let Some(tone) = input.tone() {
        out.push_str(&format!("Tone: {}\n", tone));
    }
    if let Some(length) = input.length() {
        out.push_str(&format!("Length: {}\n", length));
    }

    out.push_str("\n--- Result ---\n\n");
    out.push_str(&format!(
        "Content generated with {} based on: {}\n\n",
        tool_name, input.text
    ));
    out.push_str(PLACEHOLDER_NOTICE);
    out.push_str("\n\nThe input text, formatted and expanded to fit the tool, will appear here.");
    out
}
