use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data_api: DataApiConfig,
    pub generation: GenerationSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Which Data API backend the generator talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataApiMode {
    /// Remote backend over HTTP
    Http,
    /// Process-local store, nothing leaves the process
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataApiConfig {
    pub mode: DataApiMode,
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Issue dates are drawn from this many days back up to today
    pub lookback_days: i64,
    /// Days between quote issue and expiry
    pub quote_validity_days: i64,
    /// Days between invoice issue and due date
    pub invoice_terms_days: i64,
    /// Probability a contact becomes its account's primary contact
    pub primary_contact_probability: f64,
    /// Seed used when a request does not carry one
    pub default_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::try_from(&AppConfig::default())?;

        let config = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("BIZGRAPH").separator("__"));

        config.build()?.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8090,
            },
            data_api: DataApiConfig {
                mode: DataApiMode::InMemory,
                base_url: "http://localhost:3210".to_string(),
                auth_token: None,
                timeout_seconds: 30,
            },
            generation: GenerationSettings {
                lookback_days: 180,
                quote_validity_days: 30,
                invoice_terms_days: 30,
                primary_contact_probability: 0.3,
                default_seed: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                file_path: None,
            },
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        AppConfig::default().generation
    }
}
