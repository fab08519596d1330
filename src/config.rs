use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{BackportError, Result};
use crate::github::client::DEFAULT_API_URL;

pub const DEFAULT_CONFIG_FILE: &str = "backport-bot";
pub const ENV_PREFIX: &str = "BACKPORT_BOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub github_api_url: String,
    pub github_token: String,
    pub webhook_secret: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Loads `backport-bot.toml` from the working directory if present, then
    /// `BACKPORT_BOT_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::build(File::with_name(DEFAULT_CONFIG_FILE).required(false))
    }

    /// Loads a required configuration file, still allowing environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BackportError::ConfigError(format!(
                "Configuration file not found: {:?}",
                path
            )));
        }
        Self::build(File::from(path))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .set_default("github_api_url", DEFAULT_API_URL)?
            .set_default("github_token", "")?
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 3000_i64)?
            .set_default("request_timeout_secs", 30_i64)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.github_token.trim().is_empty() {
            return Err(BackportError::ConfigError(format!(
                "github_token is required (set {}_GITHUB_TOKEN)",
                ENV_PREFIX
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(BackportError::ConfigError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
