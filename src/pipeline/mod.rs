//! The four caller-driven operations: generate, execute, explain and chart.
//! None of them calls another; the web layer decides the order.

pub mod chart;
pub mod executor;
pub mod explainer;
pub mod gate;
pub mod generator;

use crate::llm::LlmError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use chart::{ChartConfig, ChartConfigGenerator};
pub use executor::{QueryExecutor, Row};
pub use explainer::QueryExplainer;
pub use generator::QueryGenerator;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to generate: {0}")]
    Generation(String),
    #[error("Only SELECT queries are allowed: {0}")]
    RejectedQuery(String),
    #[error("Dataset not ready: {0}")]
    NotReady(String),
    #[error("Query execution failed: {0}")]
    Execution(String),
}

impl PipelineError {
    /// Stable identifier reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Generation(_) => "generation_error",
            PipelineError::RejectedQuery(_) => "rejected_query",
            PipelineError::NotReady(_) => "not_ready",
            PipelineError::Execution(_) => "execution_error",
        }
    }
}

impl From<LlmError> for PipelineError {
    fn from(e: LlmError) -> Self {
        PipelineError::Generation(e.to_string())
    }
}

impl From<minijinja::Error> for PipelineError {
    fn from(e: minijinja::Error) -> Self {
        PipelineError::Generation(format!("prompt rendering failed: {}", e))
    }
}

/// Deserializes a structured completion into its expected shape.
pub(crate) fn decode<T: DeserializeOwned>(schema: &str, value: Value) -> Result<T, PipelineError> {
    serde_json::from_value(value).map_err(|e| {
        PipelineError::Generation(format!("{} response did not match its schema: {}", schema, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::GeneratedQuery;
    use serde_json::json;

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(PipelineError::Generation(String::new()).kind(), "generation_error");
        assert_eq!(PipelineError::RejectedQuery(String::new()).kind(), "rejected_query");
        assert_eq!(PipelineError::NotReady(String::new()).kind(), "not_ready");
        assert_eq!(PipelineError::Execution(String::new()).kind(), "execution_error");
    }

    #[test]
    fn test_llm_errors_become_generation_errors() {
        let err: PipelineError = LlmError::ConnectionError("timed out".to_string()).into();
        assert_eq!(err.kind(), "generation_error");
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_decode_reports_schema_name() {
        let err = decode::<GeneratedQuery>("generated_query", json!({ "sql": "select 1" }))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Generation(ref msg) if msg.contains("generated_query")));
    }
}
