use super::{gate, PipelineError};
use crate::db::db_pool::DuckDBConnectionManager;
use crate::db::values::to_json;
use r2d2::Pool;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One result row: column name to scalar, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

// PostgreSQL: relation "companies" does not exist
// DuckDB:     Catalog Error: Table with name companies does not exist!
static MISSING_RELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:relation|table with name)\s+"?([\w.]+)"?\s+does not exist"#).unwrap()
});

/// Validates generated SQL and runs it against the pooled database.
pub struct QueryExecutor {
    pool: Pool<DuckDBConnectionManager>,
    primary_table: String,
}

impl QueryExecutor {
    pub fn new(pool: Pool<DuckDBConnectionManager>, primary_table: &str) -> Self {
        Self {
            pool,
            primary_table: primary_table.to_string(),
        }
    }

    pub async fn execute(&self, sql: &str) -> Result<RowSet, PipelineError> {
        if let Err(e) = gate::check_select_only(sql) {
            warn!("Rejected generated SQL ({}): {}", e, sql);
            return Err(e);
        }

        let start_time = Instant::now();
        let pool = self.pool.clone();
        let statement = sql.to_string();

        let result = tokio::task::spawn_blocking(move || run_query(&pool, &statement))
            .await
            .map_err(|e| PipelineError::Execution(format!("Database task execution failed: {}", e)))?;

        match result {
            Ok(row_set) => {
                info!(
                    "Query executed successfully. Row count: {}, Execution time: {}ms",
                    row_set.rows.len(),
                    start_time.elapsed().as_millis()
                );
                Ok(row_set)
            }
            Err(message) if self.is_missing_primary_table(&message) => {
                warn!("Dataset not provisioned: {}", message);
                Err(PipelineError::NotReady(format!(
                    "table \"{}\" does not exist",
                    self.primary_table
                )))
            }
            Err(message) => Err(PipelineError::Execution(message)),
        }
    }

    fn is_missing_primary_table(&self, message: &str) -> bool {
        MISSING_RELATION.captures_iter(message).any(|caps| {
            let name = &caps[1];
            let table = name.rsplit('.').next().unwrap_or(name);
            table.eq_ignore_ascii_case(&self.primary_table)
        })
    }
}

fn run_query(pool: &Pool<DuckDBConnectionManager>, sql: &str) -> Result<RowSet, String> {
    let conn = pool
        .get()
        .map_err(|e| format!("Database connection error: {}", e))?;

    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;

    let columns = rows
        .as_ref()
        .map(|stmt| stmt.column_names())
        .unwrap_or_default();
    debug!("Result columns: {:?}", columns);

    let mut materialized = Vec::new();
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        let mut record = Row::new();
        for (i, name) in columns.iter().enumerate() {
            let value: duckdb::types::Value = row.get(i).map_err(|e| e.to_string())?;
            record.insert(name.clone(), to_json(value));
        }
        materialized.push(record);
    }

    Ok(RowSet {
        columns,
        rows: materialized,
    })
}
