use super::{decode, PipelineError, Row};
use crate::llm::models::{chart_suggestion_schema, ChartSuggestion, ChartType};
use crate::llm::{CompletionProvider, CompletionRequest};
use crate::prompts::PromptLibrary;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Ordinal palette; series beyond its length wrap around to the first entry.
pub const CHART_PALETTE: [&str; 5] = [
    "hsl(var(--chart-1))",
    "hsl(var(--chart-2))",
    "hsl(var(--chart-3))",
    "hsl(var(--chart-4))",
    "hsl(var(--chart-5))",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub description: String,
    pub takeaway: String,
    pub x_key: String,
    pub y_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_lines: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurement_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_categories: Option<Vec<String>>,
    pub colors: serde_json::Map<String, Value>,
    pub legend: bool,
}

/// Colors keyed by y-series position. Depends on nothing but the key sequence.
pub fn assign_colors(y_keys: &[String]) -> serde_json::Map<String, Value> {
    y_keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            let color = CHART_PALETTE[i % CHART_PALETTE.len()];
            (key.clone(), Value::String(color.to_string()))
        })
        .collect()
}

fn validate(suggestion: &ChartSuggestion, rows: &[Row]) -> Result<(), PipelineError> {
    if suggestion.x_key.trim().is_empty() {
        return Err(PipelineError::Generation("chart xKey is empty".to_string()));
    }
    if suggestion.y_keys.is_empty() {
        return Err(PipelineError::Generation("chart has no yKeys".to_string()));
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = suggestion.y_keys.iter().find(|key| !seen.insert(key.as_str())) {
        return Err(PipelineError::Generation(format!(
            "chart yKeys repeats column '{}'",
            duplicate
        )));
    }

    // Column existence can only be checked against data that is present.
    if let Some(first) = rows.first() {
        let missing = std::iter::once(&suggestion.x_key)
            .chain(suggestion.y_keys.iter())
            .find(|key| !first.contains_key(key.as_str()));
        if let Some(column) = missing {
            return Err(PipelineError::Generation(format!(
                "chart references unknown column '{}'",
                column
            )));
        }
    }

    Ok(())
}

pub struct ChartConfigGenerator {
    provider: Arc<dyn CompletionProvider>,
    prompts: Arc<PromptLibrary>,
}

impl ChartConfigGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>, prompts: Arc<PromptLibrary>) -> Self {
        Self { provider, prompts }
    }

    pub async fn choose_chart(
        &self,
        rows: &[Row],
        question: &str,
    ) -> Result<ChartConfig, PipelineError> {
        let data = serde_json::to_string_pretty(rows)
            .map_err(|e| PipelineError::Generation(format!("failed to serialize rows: {}", e)))?;

        let prompt = self.prompts.chart(question, &data)?;
        let request = CompletionRequest {
            system: prompt.system,
            prompt: prompt.prompt,
            output: chart_suggestion_schema(),
        };

        let value = self.provider.complete(&request).await?;
        let suggestion: ChartSuggestion = decode(request.output.name, value)?;
        validate(&suggestion, rows)?;
        debug!("Chart suggestion: {:?}", suggestion);

        let colors = assign_colors(&suggestion.y_keys);
        info!(
            "Chose {} chart with x = {} and {} series",
            suggestion.chart_type.as_str(),
            suggestion.x_key,
            suggestion.y_keys.len()
        );

        Ok(ChartConfig {
            chart_type: suggestion.chart_type,
            title: suggestion.title,
            description: suggestion.description,
            takeaway: suggestion.takeaway,
            x_key: suggestion.x_key,
            y_keys: suggestion.y_keys,
            multiple_lines: suggestion.multiple_lines,
            measurement_column: suggestion.measurement_column,
            line_categories: suggestion.line_categories,
            colors,
            legend: suggestion.legend,
        })
    }
}
