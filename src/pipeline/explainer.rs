use super::{decode, PipelineError};
use crate::llm::models::{explanation_schema, ExplanationResponse, QueryExplanation};
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::prompts::PromptLibrary;
use std::sync::Arc;
use tracing::info;

pub struct QueryExplainer {
    provider: Arc<dyn CompletionProvider>,
    prompts: Arc<PromptLibrary>,
}

impl QueryExplainer {
    pub fn new(provider: Arc<dyn CompletionProvider>, prompts: Arc<PromptLibrary>) -> Self {
        Self { provider, prompts }
    }

    /// Sections come back in the order the model produced them.
    pub async fn explain(
        &self,
        question: &str,
        sql: &str,
    ) -> Result<Vec<QueryExplanation>, PipelineError> {
        let prompt = self.prompts.explanation(question, sql)?;
        let request = CompletionRequest {
            system: prompt.system,
            prompt: prompt.prompt,
            output: explanation_schema(),
        };

        let value = self.provider.complete(&request).await?;
        let response: ExplanationResponse = decode(request.output.name, value)?;

        if response.explanations.is_empty() {
            return Err(PipelineError::Generation(
                "model returned no explanation sections".to_string(),
            ));
        }
        if let Some(position) = response
            .explanations
            .iter()
            .position(|e| e.section.trim().is_empty())
        {
            return Err(PipelineError::Generation(format!(
                "explanation section {} has no SQL fragment",
                position
            )));
        }

        info!("Explained query in {} sections", response.explanations.len());
        Ok(response.explanations)
    }
}
