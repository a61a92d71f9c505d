use crate::config::AppConfig;
use crate::db::db_pool::DuckDBConnectionManager;
use crate::llm::LlmManager;
use crate::pipeline::{ChartConfigGenerator, QueryExecutor, QueryExplainer, QueryGenerator};
use crate::prompts::PromptLibrary;
use r2d2::Pool;
use std::sync::Arc;

/// Shared application state for the web server
pub struct AppState {
    pub llm_manager: LlmManager,
    pub generator: QueryGenerator,
    pub executor: QueryExecutor,
    pub explainer: QueryExplainer,
    pub charts: ChartConfigGenerator,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        llm_manager: LlmManager,
        db_pool: Pool<DuckDBConnectionManager>,
    ) -> Result<Self, minijinja::Error> {
        let prompts = Arc::new(PromptLibrary::new()?);
        let provider = llm_manager.provider();

        Ok(Self {
            generator: QueryGenerator::new(Arc::clone(&provider), Arc::clone(&prompts)),
            executor: QueryExecutor::new(db_pool, &config.database.primary_table),
            explainer: QueryExplainer::new(Arc::clone(&provider), Arc::clone(&prompts)),
            charts: ChartConfigGenerator::new(provider, prompts),
            llm_manager,
            startup_time: chrono::Utc::now(),
        })
    }
}
