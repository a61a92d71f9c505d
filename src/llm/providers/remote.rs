use crate::config::LlmConfig;
use crate::llm::{CompletionProvider, CompletionRequest, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible chat completions with `json_schema` structured output.
pub struct RemoteLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Deserialize)]
struct PromptResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl RemoteLlmProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::ConfigError("API key is required for remote LLM provider".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> PromptRequest<'a> {
        PromptRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: request.output.name,
                    strict: true,
                    schema: &request.output.schema,
                },
            },
        }
    }
}

fn extract_object(response: PromptResponse) -> Result<Value, LlmError> {
    let message = match response.choices.into_iter().next() {
        Some(choice) => choice.message,
        None => return Err(LlmError::ResponseError("No choices in response".to_string())),
    };

    if let Some(refusal) = message.refusal {
        return Err(LlmError::ResponseError(format!("Model refused: {}", refusal)));
    }

    let content = message
        .content
        .ok_or_else(|| LlmError::ResponseError("Response message has no content".to_string()))?;

    serde_json::from_str(&content).map_err(|e| {
        LlmError::ResponseError(format!("Structured output is not valid JSON: {}", e))
    })
}

#[async_trait]
impl CompletionProvider for RemoteLlmProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        debug!(
            "Sending {} request to {} with model {}",
            request.output.name, self.api_url, self.model
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "API responded with status code: {}{}",
                status, error_body
            )));
        }

        let prompt_response: PromptResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        extract_object(prompt_response)
    }

    fn name(&self) -> &str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::models::generated_query_schema;
    use serde_json::json;

    fn provider() -> RemoteLlmProvider {
        let mut config = AppConfig::default().llm;
        config.backend = "remote".to_string();
        config.api_key = Some("sk-test".to_string());
        RemoteLlmProvider::new(&config).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "You are a SQL expert.".to_string(),
            prompt: "How many carriers are in Texas?".to_string(),
            output: generated_query_schema(),
        }
    }

    #[test]
    fn test_request_uses_strict_json_schema() {
        let provider = provider();
        let request = request();
        let body = serde_json::to_value(provider.build_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "How many carriers are in Texas?");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "generated_query");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(
            body["response_format"]["json_schema"]["schema"]["required"],
            json!(["query"])
        );
    }

    #[test]
    fn test_default_api_url() {
        assert_eq!(provider().api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_extract_object_parses_content() {
        let response: PromptResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "{\"query\": \"select 1, 2\"}" } }]
        }))
        .unwrap();
        assert_eq!(extract_object(response).unwrap(), json!({ "query": "select 1, 2" }));
    }

    #[test]
    fn test_extract_object_failures() {
        let empty: PromptResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(extract_object(empty), Err(LlmError::ResponseError(_))));

        let refused: PromptResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": null, "refusal": "I can't help with that" } }]
        }))
        .unwrap();
        match extract_object(refused) {
            Err(LlmError::ResponseError(msg)) => assert!(msg.contains("refused")),
            _ => panic!("expected a refusal error"),
        }

        let garbled: PromptResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "SELECT * FROM companies" } }]
        }))
        .unwrap();
        assert!(matches!(extract_object(garbled), Err(LlmError::ResponseError(_))));
    }
}
