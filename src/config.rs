use crate::db::db_pool::IN_MEMORY;
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub pool_size: u32,
    pub read_only: bool,
    /// Table whose absence means the dataset has not been provisioned yet.
    pub primary_table: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "remote" or "ollama"
    pub model: String,   // Model name
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LogConfig {
    pub format: String, // "pretty" or "json"
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub log: LogConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// DuckDB database file (or :memory:)
    #[arg(long, value_name = "PATH")]
    pub database: Option<String>,
}

const DEFAULT_LOCATIONS: [&str; 3] = [
    "config.toml",
    "config/config.toml",
    "/etc/nl-freight/config.toml",
];

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::load(args, std::env::vars().collect(), &DEFAULT_LOCATIONS)
    }

    /// Layers defaults, the config file, `env` and `args`, in that order.
    fn load(
        args: &CliArgs,
        env: config::Map<String, String>,
        default_locations: &[&str],
    ) -> Result<Self, ConfigError> {
        let mut config_builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else if let Some(location) = find_config_file(default_locations) {
            config_builder =
                config_builder.add_source(File::new(location, config::FileFormat::Toml));
        }

        let api_key = env.get("OPENAI_API_KEY").cloned();

        // NL_FREIGHT__LLM__MODEL=gpt-4o-mini etc.
        config_builder = config_builder.add_source(
            Environment::with_prefix("NL_FREIGHT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(env)),
        );

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;
        config.apply_overrides(args);

        if config.llm.api_key.is_none() {
            config.llm.api_key = api_key;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(host) = &args.host {
            self.web.host = host.clone();
        }
        if let Some(port) = args.port {
            self.web.port = port;
        }
        if let Some(database) = &args.database {
            self.database.connection_string = database.clone();
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.pool_size == 0 {
            return Err(ConfigError::Message(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        if self.database.read_only && self.database.connection_string == IN_MEMORY {
            return Err(ConfigError::Message(
                "database.read_only cannot be used with an in-memory database".to_string(),
            ));
        }
        Ok(())
    }
}

fn find_config_file<'a>(locations: &[&'a str]) -> Option<&'a str> {
    locations
        .iter()
        .copied()
        .find(|location| Path::new(location).exists())
}

// Default implementation
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                connection_string: "nl-freight.duckdb".to_string(),
                pool_size: 5,
                read_only: false,
                primary_table: "companies".to_string(),
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            llm: LlmConfig {
                backend: "remote".to_string(),
                model: "gpt-4o".to_string(),
                api_key: None,
                api_url: None,
                temperature: 0.1,
                timeout_secs: 60,
            },
            log: LogConfig {
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn load(toml: &str, args: &CliArgs) -> AppConfig {
        let mut config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default()).unwrap())
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        config.apply_overrides(args);
        config
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = load(
            r#"
            [llm]
            backend = "ollama"
            model = "llama3.1"
            "#,
            &CliArgs::default(),
        );

        assert_eq!(config.llm.backend, "ollama");
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.database.primary_table, "companies");
        assert_eq!(config.web.port, 3000);
    }

    #[test]
    fn test_cli_overrides_file() {
        let args = CliArgs {
            port: Some(8080),
            database: Some(":memory:".to_string()),
            ..Default::default()
        };
        let config = load(
            r#"
            [web]
            host = "0.0.0.0"
            port = 9000
            "#,
            &args,
        );

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.database.connection_string, ":memory:");
    }

    fn env(vars: &[(&str, &str)]) -> config::Map<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("nl-freight-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_env_layers_over_defaults() {
        let config = AppConfig::load(
            &CliArgs::default(),
            env(&[
                ("NL_FREIGHT__LLM__MODEL", "gpt-4o-mini"),
                ("NL_FREIGHT__DATABASE__POOL_SIZE", "2"),
                ("OPENAI_API_KEY", "sk-env"),
                ("UNRELATED", "ignored"),
            ]),
            &[],
        )
        .unwrap();

        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.database.pool_size, 2);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert_eq!(config.llm.backend, "remote");
    }

    #[test]
    fn test_configured_api_key_wins_over_fallback() {
        let config = AppConfig::load(
            &CliArgs::default(),
            env(&[
                ("NL_FREIGHT__LLM__API_KEY", "sk-configured"),
                ("OPENAI_API_KEY", "sk-env"),
            ]),
            &[],
        )
        .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-configured"));
    }

    #[test]
    fn test_config_file_then_env_then_cli() {
        let path = write_temp(
            "layers",
            "[web]\nhost = \"0.0.0.0\"\nport = 9000\n\n[llm]\nmodel = \"llama3.1\"\n",
        );
        let args = CliArgs {
            config: Some(path.clone()),
            port: Some(8080),
            ..Default::default()
        };

        let config =
            AppConfig::load(&args, env(&[("NL_FREIGHT__LLM__MODEL", "qwen2.5")]), &[]).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.llm.model, "qwen2.5");
    }

    #[test]
    fn test_first_existing_default_location_is_used() {
        let path = write_temp("default-location", "[database]\nprimary_table = \"carriers\"\n");
        let location = path.to_str().unwrap();

        assert_eq!(
            find_config_file(&["./does-not-exist.toml", location]),
            Some(location)
        );
        let config = AppConfig::load(
            &CliArgs::default(),
            env(&[]),
            &["./does-not-exist.toml", location],
        )
        .unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.database.primary_table, "carriers");
        assert_eq!(find_config_file(&["./does-not-exist.toml"]), None);
    }

    #[test]
    fn test_zero_pool_size_is_rejected() {
        let result = AppConfig::load(
            &CliArgs::default(),
            env(&[("NL_FREIGHT__DATABASE__POOL_SIZE", "0")]),
            &[],
        );
        assert!(matches!(result, Err(ConfigError::Message(ref msg)) if msg.contains("pool_size")));
    }

    #[test]
    fn test_oversized_pool_size_is_rejected() {
        let result = AppConfig::load(
            &CliArgs::default(),
            env(&[("NL_FREIGHT__DATABASE__POOL_SIZE", "5000000000")]),
            &[],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_read_only_in_memory_is_rejected() {
        let args = CliArgs {
            database: Some(IN_MEMORY.to_string()),
            ..Default::default()
        };
        let result = AppConfig::load(&args, env(&[("NL_FREIGHT__DATABASE__READ_ONLY", "true")]), &[]);
        assert!(matches!(result, Err(ConfigError::Message(ref msg)) if msg.contains("read_only")));
    }
}
