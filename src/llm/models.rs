use serde::{Deserialize, Serialize};
use serde_json::json;

use super::OutputSchema;

// Structured output for SQL generation
#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub query: String,
}

// One clause of the generated SQL with its explanation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryExplanation {
    pub section: String,
    pub explanation: String,
}

// Structured output for query explanation
#[derive(Debug, Serialize, Deserialize)]
pub struct ExplanationResponse {
    pub explanations: Vec<QueryExplanation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    Line,
    Area,
    Pie,
    Scatter,
}

impl ChartType {
    pub const ALL: [ChartType; 5] = [
        ChartType::Bar,
        ChartType::Line,
        ChartType::Area,
        ChartType::Pie,
        ChartType::Scatter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Area => "area",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
        }
    }
}

// Structured output for chart selection. Colors are not part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSuggestion {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub takeaway: String,
    pub x_key: String,
    pub y_keys: Vec<String>,
    #[serde(default)]
    pub multiple_lines: Option<bool>,
    #[serde(default)]
    pub measurement_column: Option<String>,
    #[serde(default)]
    pub line_categories: Option<Vec<String>>,
    pub legend: bool,
}

pub fn generated_query_schema() -> OutputSchema {
    OutputSchema {
        name: "generated_query",
        schema: json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

pub fn explanation_schema() -> OutputSchema {
    OutputSchema {
        name: "query_explanation",
        schema: json!({
            "type": "object",
            "properties": {
                "explanations": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "section": { "type": "string" },
                            "explanation": { "type": "string" }
                        },
                        "required": ["section", "explanation"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["explanations"],
            "additionalProperties": false
        }),
    }
}

pub fn chart_suggestion_schema() -> OutputSchema {
    let chart_types: Vec<&str> = ChartType::ALL.iter().map(ChartType::as_str).collect();

    // Strict mode needs every property listed as required; optional ones are nullable.
    OutputSchema {
        name: "chart_config",
        schema: json!({
            "type": "object",
            "description": "Chart configuration object",
            "properties": {
                "description": {
                    "type": "string",
                    "description": "Describe the chart. What is it showing? What is interesting about the way the data is displayed?"
                },
                "takeaway": {
                    "type": "string",
                    "description": "What is the main takeaway from the chart?"
                },
                "type": {
                    "type": "string",
                    "enum": chart_types,
                    "description": "Type of chart"
                },
                "title": { "type": "string" },
                "xKey": {
                    "type": "string",
                    "description": "Key for x-axis or category"
                },
                "yKeys": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Key(s) for y-axis values, typically the quantitative columns"
                },
                "multipleLines": {
                    "type": ["boolean", "null"],
                    "description": "For line charts only: whether the chart is comparing groups of data"
                },
                "measurementColumn": {
                    "type": ["string", "null"],
                    "description": "For line charts only: key for the quantitative y-axis column to measure against"
                },
                "lineCategories": {
                    "type": ["array", "null"],
                    "items": { "type": "string" },
                    "description": "For line charts only: categories used to compare different lines, one per line"
                },
                "legend": {
                    "type": "boolean",
                    "description": "Whether to show legend"
                }
            },
            "required": [
                "description", "takeaway", "type", "title", "xKey", "yKeys",
                "multipleLines", "measurementColumn", "lineCategories", "legend"
            ],
            "additionalProperties": false
        }),
    }
}
