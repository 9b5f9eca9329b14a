//! Generation-model collaborator.
//!
//! [`GenerationModel::complete`] takes a fully rendered prompt and
//! sampling parameters and returns a [`ModelOutput`]: an ordered set of
//! named output fields. Well-behaved providers return exactly one field;
//! the condenser treats anything else as a configuration fault.
//!
//! The shipped provider, [`OpenAiChatModel`], speaks the OpenAI-compatible
//! `chat/completions` protocol (which also covers Ollama, OpenRouter, and
//! similar endpoints). One attempt per call; retry policy belongs to the
//! caller.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ModelConfig;
use crate::error::PipelineError;
use crate::models::{Credential, SamplingParams};

/// The named output fields of one completion call, in provider order.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    fields: Vec<(String, String)>,
}

impl ModelOutput {
    /// An output with a single named field, the well-formed shape.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            fields: vec![(name.into(), value.into())],
        }
    }

    /// Append another field. Only integrations under test construct
    /// multi-field outputs; the pipeline rejects them.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Unwrap the single output value. More or fewer than one field means
    /// the model integration violates the contract: a fatal
    /// [`PipelineError::Configuration`], not a user-facing retry.
    pub fn into_single_value(self) -> Result<String, PipelineError> {
        if self.fields.len() != 1 {
            return Err(PipelineError::configuration(format!(
                "generation model returned {} output fields, expected exactly one",
                self.fields.len()
            )));
        }
        Ok(self.fields.into_iter().next().unwrap().1)
    }
}

#[async_trait]
pub trait GenerationModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        params: &SamplingParams,
        credential: &Credential,
    ) -> Result<ModelOutput, PipelineError>;
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiChatModel {
    endpoint: String,
    model: String,
    default_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.name.clone(),
            default_key: std::env::var("OPENAI_API_KEY").ok(),
            client,
        })
    }

    fn resolve_key(&self, credential: &Credential) -> Result<String, PipelineError> {
        credential
            .token()
            .map(str::to_string)
            .or_else(|| self.default_key.clone())
            .ok_or_else(|| {
                PipelineError::upstream(
                    "model",
                    "no API credential available (request credential or OPENAI_API_KEY)",
                )
            })
    }
}

#[async_trait]
impl GenerationModel for OpenAiChatModel {
    async fn complete(
        &self,
        prompt: &str,
        params: &SamplingParams,
        credential: &Credential,
    ) -> Result<ModelOutput, PipelineError> {
        let key = self.resolve_key(credential)?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": params.temperature,
            "top_p": params.top_p,
            "max_tokens": params.max_tokens,
        });

        tracing::debug!(endpoint = %self.endpoint, model = %self.model, "completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::upstream("model", e))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| PipelineError::upstream("model", e))?;

        if !status.is_success() {
            return Err(PipelineError::upstream(
                "model",
                format!("API error {}: {}", status, body_text),
            ));
        }

        // Gateways occasionally hand back HTML error pages with a 200;
        // catch that before serde produces a cryptic parse error.
        let trimmed = body_text.trim_start();
        if trimmed.starts_with('<') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(PipelineError::upstream(
                "model",
                format!("endpoint returned HTML instead of JSON: {}", preview),
            ));
        }

        let json: serde_json::Value = serde_json::from_str(&body_text)
            .map_err(|e| PipelineError::upstream("model", format!("invalid JSON response: {}", e)))?;

        let content = json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                PipelineError::upstream("model", "invalid response: missing choices[0].message.content")
            })?;

        Ok(ModelOutput::single("text", content.to_string()))
    }
}

/// Instantiate the generation model named in the configuration.
pub fn create_model(config: &ModelConfig) -> anyhow::Result<Arc<dyn GenerationModel>> {
    Ok(Arc::new(OpenAiChatModel::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_field_unwraps() {
        let output = ModelOutput::single("text", "an answer");
        assert_eq!(output.into_single_value().unwrap(), "an answer");
    }

    #[test]
    fn multiple_fields_are_a_configuration_fault() {
        let output = ModelOutput::single("text", "a").with_field("reasoning", "b");
        let err = output.into_single_value().unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
