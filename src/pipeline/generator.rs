use super::{decode, PipelineError};
use crate::llm::models::{generated_query_schema, GeneratedQuery};
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::prompts::PromptLibrary;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns a question into a single SELECT statement.
pub struct QueryGenerator {
    provider: Arc<dyn CompletionProvider>,
    prompts: Arc<PromptLibrary>,
}

impl QueryGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, prompts: Arc<PromptLibrary>) -> Self {
        Self { provider, prompts }
    }

    /// The returned statement is not validated here; the executor's gate does that.
    pub async fn generate(&self, question: &str) -> Result<String, PipelineError> {
        info!("Generating SQL for question: {}", question);

        let prompt = self.prompts.generation(question)?;
        debug!("Prepared generation prompt: {}", prompt.prompt);

        let request = CompletionRequest {
            system: prompt.system,
            prompt: prompt.prompt,
            output: generated_query_schema(),
        };

        let value = self.provider.complete(&request).await?;
        let generated: GeneratedQuery = decode(request.output.name, value)?;

        if generated.query.trim().is_empty() {
            return Err(PipelineError::Generation(
                "model returned an empty query".to_string(),
            ));
        }

        info!("Generated SQL: {}", generated.query);
        Ok(generated.query)
    }
}
