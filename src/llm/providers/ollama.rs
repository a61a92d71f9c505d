use crate::config::LlmConfig;
use crate::llm::{CompletionProvider, CompletionRequest, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    format: &'a Value,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    done: Option<bool>,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434/api/generate".to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> OllamaRequest<'a> {
        OllamaRequest {
            model: &self.model,
            system: &request.system,
            prompt: &request.prompt,
            format: &request.output.schema,
            stream: false, // Explicitly disable streaming
            options: OllamaOptions {
                temperature: self.temperature,
            },
        }
    }
}

fn parse_response(response_text: &str) -> Result<Value, LlmError> {
    let ollama_response = serde_json::from_str::<OllamaResponse>(response_text).map_err(|e| {
        error!(
            "Failed to parse Ollama response: {} - Response was: {}",
            e, response_text
        );
        LlmError::ResponseError(format!("Failed to parse Ollama response: {}", e))
    })?;

    if ollama_response.done == Some(false) {
        return Err(LlmError::ResponseError(
            "Ollama returned an incomplete response".to_string(),
        ));
    }

    debug!("Extracted response from Ollama: {}", ollama_response.response);

    serde_json::from_str(ollama_response.response.trim()).map_err(|e| {
        LlmError::ResponseError(format!("Structured output is not valid JSON: {}", e))
    })
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        info!(
            "Sending {} request to Ollama with model: {}",
            request.output.name, self.model
        );
        debug!("API URL: {}", self.api_url);

        let response = self
            .client
            .post(&self.api_url)
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Try to get the error message from the response body
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        debug!("Raw response from Ollama: {}", response_text);

        parse_response(&response_text)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::models::explanation_schema;
    use serde_json::json;

    #[test]
    fn test_request_passes_schema_as_format() {
        let mut config = AppConfig::default().llm;
        config.backend = "ollama".to_string();
        config.model = "llama3.1".to_string();
        let provider = OllamaProvider::new(&config).unwrap();

        let request = CompletionRequest {
            system: "Explain the query.".to_string(),
            prompt: "select 1, 2".to_string(),
            output: explanation_schema(),
        };
        let body = serde_json::to_value(provider.build_request(&request)).unwrap();

        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["system"], "Explain the query.");
        assert_eq!(body["stream"], false);
        assert_eq!(body["format"]["required"], json!(["explanations"]));
        assert!(body["options"]["temperature"].is_number());
        assert_eq!(provider.api_url, "http://localhost:11434/api/generate");
    }

    #[test]
    fn test_parse_response_reads_structured_body() {
        let raw = json!({
            "model": "llama3.1",
            "created_at": "2024-05-01T10:00:00Z",
            "response": "{\"query\": \"select state_code, count(*) from companies group by state_code\"}",
            "done": true,
            "eval_count": 42
        })
        .to_string();

        let value = parse_response(&raw).unwrap();
        assert_eq!(
            value["query"],
            "select state_code, count(*) from companies group by state_code"
        );
    }

    #[test]
    fn test_parse_response_rejects_free_text() {
        let raw = json!({ "response": "Here is your query: SELECT 1", "done": true }).to_string();
        assert!(matches!(parse_response(&raw), Err(LlmError::ResponseError(_))));
        assert!(matches!(parse_response("not json"), Err(LlmError::ResponseError(_))));
    }
}
