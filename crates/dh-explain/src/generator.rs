//! The optional external text generator (spec §4.15, §5): a read-only,
//! deterministic-temperature call with a configurable timeout, treated as
//! failed on expiry or non-2xx response. Uses `ureq`'s blocking HTTP client
//! for a POST with a JSON body and a per-call timeout.

use dh_core::{DhError, DhResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A read-only external text generator. Implementors must never mutate
/// state the rest of the pipeline depends on (spec §1's non-goal: "the
/// optional LLM is strictly read-only").
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str, temperature: f64, timeout: Duration) -> DhResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// An OpenAI-compatible chat-completion endpoint called synchronously via
/// `ureq`. Never logs `api_key`.
pub struct HttpTextGenerator {
    pub endpoint: String,
    pub model: String,
    api_key: String,
}

impl HttpTextGenerator {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into(), model: model.into(), api_key: api_key.into() }
    }
}

impl TextGenerator for HttpTextGenerator {
    fn generate(&self, prompt: &str, temperature: f64, timeout: Duration) -> DhResult<String> {
        let request = ChatRequest {
            model: &self.model,
            temperature,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };
        let response = ureq::post(&self.endpoint)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .timeout(timeout)
            .send_json(serde_json::to_value(&request).map_err(|e| DhError::Parse(e.to_string()))?);

        match response {
            Ok(resp) => {
                let body: ChatResponse = resp
                    .into_json()
                    .map_err(|e| DhError::ExternalServiceUnavailable(format!("malformed response body: {e}")))?;
                body.choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .ok_or_else(|| DhError::ExternalServiceUnavailable("empty choices array".into()))
            }
            Err(ureq::Error::Status(code, _)) => {
                Err(DhError::ExternalServiceUnavailable(format!("HTTP {code}")))
            }
            Err(ureq::Error::Transport(t)) => {
                Err(DhError::ExternalServiceUnavailable(format!("transport error: {t}")))
            }
        }
    }
}

/// A generator that always fails, used to force the template fallback path
/// (`--no-fallback` testing, or when no LLM is configured).
pub struct UnavailableGenerator;

impl TextGenerator for UnavailableGenerator {
    fn generate(&self, _prompt: &str, _temperature: f64, _timeout: Duration) -> DhResult<String> {
        Err(DhError::ExternalServiceUnavailable("no text generator configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_generator_always_fails() {
        let gen = UnavailableGenerator;
        assert!(gen.generate("hello", 0.0, Duration::from_secs(1)).is_err());
    }
}
