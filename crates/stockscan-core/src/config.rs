use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::StockscanError;
use crate::pricing::DEFAULT_BATCH_SIZE;

pub const DEFAULT_CONFIG_FILE: &str = "stockscan.toml";

/// Application configuration, read from a TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub secrets: Secrets,
    pub app: AppSettings,
    pub oracle: OracleSettings,
    pub pricing: PricingSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Secrets {
    pub mail_access_token: Option<String>,
    pub mail_refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub openai_api_key: Option<String>,
    pub price_runner_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Mail lookback window in days.
    pub days: i64,
    pub output_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            days: 7,
            output_dir: PathBuf::from("output"),
            log_dir: Some(PathBuf::from("logs")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            base_url: "https://api.openai.com/v1".into(),
            timeout_secs: 60,
        }
    }
}

impl OracleSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    pub country: String,
    pub batch_size: usize,
    pub base_url: String,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            country: "UK".into(),
            batch_size: DEFAULT_BATCH_SIZE,
            base_url: crate::pricing::pricerunner::DEFAULT_BASE_URL.into(),
        }
    }
}

/// Load and check a configuration file.
pub fn load_config(path: &Path) -> Result<AppConfig, StockscanError> {
    let content = std::fs::read_to_string(path).map_err(|e| StockscanError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&content, path)
}

/// Parse a configuration from TOML text.
pub fn parse_config(content: &str, source: &Path) -> Result<AppConfig, StockscanError> {
    let config: AppConfig = toml::from_str(content).map_err(|e| StockscanError::ConfigLoad {
        path: source.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Check value ranges. Secrets are checked separately per command.
pub fn validate_config(config: &AppConfig) -> Result<(), StockscanError> {
    if config.app.days <= 0 {
        return Err(StockscanError::ConfigInvalid(format!(
            "app.days must be positive, got {}",
            config.app.days
        )));
    }
    if config.pricing.batch_size == 0 || config.pricing.batch_size > DEFAULT_BATCH_SIZE {
        return Err(StockscanError::ConfigInvalid(format!(
            "pricing.batch_size must be between 1 and {DEFAULT_BATCH_SIZE}, got {}",
            config.pricing.batch_size
        )));
    }
    if config.oracle.timeout_secs == 0 {
        return Err(StockscanError::ConfigInvalid(
            "oracle.timeout_secs must be positive".into(),
        ));
    }
    Ok(())
}

fn present(secret: &Option<String>) -> bool {
    secret.as_deref().is_some_and(|s| !s.trim().is_empty())
}

impl Secrets {
    /// Names of secrets a full run needs but the file lacks.
    pub fn missing_for_run(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !present(&self.mail_access_token) {
            missing.push("mail_access_token");
        }
        if present(&self.mail_refresh_token) && !present(&self.client_id) {
            missing.push("client_id");
        }
        if !present(&self.openai_api_key) {
            missing.push("openai_api_key");
        }
        if !present(&self.price_runner_token) {
            missing.push("price_runner_token");
        }
        missing
    }

    /// Fail listing every missing secret at once.
    pub fn require_for_run(&self) -> Result<(), StockscanError> {
        let missing = self.missing_for_run();
        if missing.is_empty() {
            return Ok(());
        }
        Err(StockscanError::ConfigInvalid(format!(
            "missing secrets: {}",
            missing
                .iter()
                .map(|name| format!("secrets.{name}"))
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    pub fn openai_api_key(&self) -> Result<&str, StockscanError> {
        self.openai_api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| StockscanError::ConfigInvalid("missing secrets: secrets.openai_api_key".into()))
    }
}
