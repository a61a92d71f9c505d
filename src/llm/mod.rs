pub mod models;
pub mod providers;

#[cfg(test)]
pub mod mock;

use crate::config::LlmConfig;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// A named JSON Schema the completion must conform to.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: &'static str,
    pub schema: Value,
}

/// One structured completion call: instruction, task text and output contract.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub output: OutputSchema,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the structured object produced by the model, parsed but not yet validated.
    async fn complete(&self, request: &CompletionRequest) -> Result<Value, LlmError>;

    fn name(&self) -> &str;
}

pub struct LlmManager {
    provider: Arc<dyn CompletionProvider>,
    backend: String,
    model: String,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider: Arc<dyn CompletionProvider> = match config.backend.as_str() {
            "remote" => Arc::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Arc::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self {
            backend: provider.name().to_string(),
            provider,
            model: config.model.clone(),
        })
    }

    #[cfg(test)]
    pub fn with_provider(provider: Arc<dyn CompletionProvider>, model: &str) -> Self {
        Self {
            backend: provider.name().to_string(),
            provider,
            model: model.to_string(),
        }
    }

    pub fn provider(&self) -> Arc<dyn CompletionProvider> {
        Arc::clone(&self.provider)
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}
