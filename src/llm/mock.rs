use super::{CompletionProvider, CompletionRequest, LlmError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Test double that answers each output schema with a canned value and records requests.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: HashMap<&'static str, Result<Value, String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, schema: &'static str, value: Value) -> Self {
        self.responses.insert(schema, Ok(value));
        self
    }

    pub fn fail(mut self, schema: &'static str, message: &str) -> Self {
        self.responses.insert(schema, Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.responses.get(request.output.name) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(LlmError::ConnectionError(message.clone())),
            None => Err(LlmError::ResponseError(format!(
                "no scripted response for {}",
                request.output.name
            ))),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
