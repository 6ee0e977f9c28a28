// PromptDeck: HTTP-based generation provider (Gemini generateContent API)

use super::*;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// GeminiProvider speaks the Gemini `models/{model}:generateContent` REST API.
pub struct GeminiProvider {
    api_base: Url,
    client: Client,
    max_retries: usize,
    retry_delay: Duration,
}

impl GeminiProvider {
    pub fn new(
        api_base: String,
        timeout: Duration,
        max_retries: usize,
        retry_delay: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let api_base = if api_base.is_empty() {
            Url::parse(DEFAULT_API_BASE)?
        } else {
            Url::parse(&api_base)?
        };
        if api_base.cannot_be_a_base() {
            anyhow::bail!("API base {} cannot carry a path", api_base);
        }

        Ok(Self {
            api_base,
            client,
            max_retries,
            retry_delay,
        })
    }

    /// `{api_base}/models/{model}:generateContent`, with the model id
    /// percent-encoded as a single path segment.
    fn endpoint(&self, model: &str) -> anyhow::Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API base {} cannot carry a path", self.api_base))?
            .pop_if_empty()
            .push("models")
            .push(&format!("{}:generateContent", model));
        Ok(url)
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn invoke(&self, prompt: &str, model: &str, api_key: &str) -> anyhow::Result<String> {
        let url = self.endpoint(model)?;
        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::info!(
                    attempt = attempt,
                    "Retrying generation request after {}ms delay",
                    self.retry_delay.as_millis()
                );
                tokio::time::sleep(self.retry_delay).await;
            }

            tracing::debug!(
                url = %url,
                model = %model,
                attempt = attempt,
                "Sending generation request"
            );

            let res = self
                .client
                .post(url.clone())
                .header("x-goog-api-key", api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match res {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let response_body = response.text().await?;
                        tracing::debug!(status = %status, body_len = response_body.len(), "Generation response received");
                        return parse_response(&response_body);
                    }

                    let is_transient = status.is_server_error() || status.as_u16() == 429;
                    let response_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "could not read body".to_string());

                    if is_transient && attempt < self.max_retries {
                        tracing::warn!(status = %status, attempt = attempt, "Transient generation API error: {}", response_body);
                        last_error = Some(anyhow::anyhow!(
                            "generation API error ({}): {}",
                            status,
                            response_body
                        ));
                        continue;
                    } else {
                        anyhow::bail!("generation API error ({}): {}", status, response_body);
                    }
                }
                Err(e) if attempt < self.max_retries => {
                    tracing::warn!(error = %e, attempt = attempt, "Network error during generation request");
                    last_error = Some(anyhow::Error::from(e));
                    continue;
                }
                Err(e) => return Err(anyhow::Error::from(e)),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!(
                "generation request failed after {} attempts",
                self.max_retries + 1
            )
        }))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Parse a `generateContent` response into the concatenated candidate text.
fn parse_response(body: &str) -> anyhow::Result<String> {
    let v: serde_json::Value = serde_json::from_str(body)?;

    if let Some(err) = v.get("error") {
        let msg = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        anyhow::bail!("generation API error: {}", msg);
    }

    let candidate = v
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = v
                .get("promptFeedback")
                .and_then(|f| f.get("blockReason"))
                .and_then(|r| r.as_str())
                .unwrap_or("none");
            anyhow::anyhow!("no candidates in generation response (block reason: {})", reason)
        })?;

    let text: String = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let finish_reason = candidate
            .get("finishReason")
            .and_then(|f| f.as_str())
            .unwrap_or("unknown");
        anyhow::bail!("empty generation response (finish reason: {})", finish_reason);
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_response() {
        let json = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello!"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        }"#;

        assert_eq!(parse_response(json).unwrap(), "Hello!");
    }

    #[test]
    fn test_parse_joins_parts() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "Hel"}, {"text": "lo"}]}}]}"#;
        assert_eq!(parse_response(json).unwrap(), "Hello");
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        let result = parse_response(json);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not valid"));
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let json = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_response(json).unwrap_err().to_string();
        assert!(err.contains("SAFETY"));
    }

    #[test]
    fn test_parse_empty_text_is_error() {
        let json = r#"{"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}"#;
        let err = parse_response(json).unwrap_err().to_string();
        assert!(err.contains("MAX_TOKENS"));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let p = GeminiProvider::new(
            "http://localhost:9000/v1beta/".into(),
            Duration::from_secs(5),
            0,
            Duration::from_millis(0),
        )
        .unwrap();
        assert_eq!(
            p.endpoint("gemini-2.5-flash").unwrap().as_str(),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_endpoint_keeps_model_in_one_segment() {
        let p = GeminiProvider::new(
            "http://localhost:9000/v1beta".into(),
            Duration::from_secs(5),
            0,
            Duration::from_millis(0),
        )
        .unwrap();
        let url = p.endpoint("../../admin/secret?steal=1#").unwrap();

        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], "v1beta");
        assert_eq!(segments[1], "models");
        assert!(segments[2].ends_with(":generateContent"));
        assert!(!segments[2].contains('/'));
    }

    #[test]
    fn test_rejects_unparseable_api_base() {
        let result = GeminiProvider::new(
            "not a url".into(),
            Duration::from_secs(5),
            0,
            Duration::from_millis(0),
        );
        assert!(result.is_err());
    }
}
