use crate::config::DatabaseConfig;
use duckdb::{AccessMode, Config, Connection};
use r2d2::{ManageConnection, Pool};

pub const IN_MEMORY: &str = ":memory:";

pub struct DuckDBConnectionManager {
    connection_string: String,
    read_only: bool,
}

impl DuckDBConnectionManager {
    pub fn new(connection_string: String, read_only: bool) -> Self {
        Self {
            connection_string,
            read_only,
        }
    }

    fn flags(&self) -> Result<Config, duckdb::Error> {
        let mode = if self.read_only {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        Config::default().access_mode(mode)
    }
}

impl ManageConnection for DuckDBConnectionManager {
    type Connection = Connection;
    type Error = duckdb::Error;

    fn connect(&self) -> Result<Self::Connection, Self::Error> {
        if self.connection_string == IN_MEMORY {
            Connection::open_in_memory_with_flags(self.flags()?)
        } else {
            Connection::open_with_flags(&self.connection_string, self.flags()?)
        }
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.execute("SELECT 1", [])?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Every in-memory connection is a separate database, so `:memory:` pools hold one.
pub fn build_pool(config: &DatabaseConfig) -> Result<Pool<DuckDBConnectionManager>, r2d2::Error> {
    let max_size = if config.connection_string == IN_MEMORY {
        1
    } else {
        config.pool_size
    };

    Pool::builder().max_size(max_size).build(DuckDBConnectionManager::new(
        config.connection_string.clone(),
        config.read_only,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn test_in_memory_pool_connects() {
        let pool = Pool::builder()
            .max_size(1)
            .build(DuckDBConnectionManager::new(IN_MEMORY.to_string(), false))
            .unwrap();

        let conn = pool.get().unwrap();
        let answer: i64 = conn.query_row("SELECT 40 + 2", [], |row| row.get(0)).unwrap();
        assert_eq!(answer, 42);
    }

    #[test]
    fn test_in_memory_pool_shares_one_database() {
        let mut config = AppConfig::default().database;
        config.connection_string = IN_MEMORY.to_string();
        config.pool_size = 4;

        let pool = build_pool(&config).unwrap();
        assert_eq!(pool.max_size(), 1);

        pool.get()
            .unwrap()
            .execute_batch("CREATE TABLE companies (id INTEGER); INSERT INTO companies VALUES (1);")
            .unwrap();
        let count: i64 = pool
            .get()
            .unwrap()
            .query_row("SELECT count(*) FROM companies", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
