use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{DEFAULT_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::error::DatamartError;
use crate::search::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001/api";
const CONFIG_FILE: &str = "datamart.json";

/// On-disk client settings, all optional.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub retries: Option<usize>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_base_url: String,
    pub timeout: Duration,
    pub retries: usize,
    pub page_size: u32,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves settings from (highest to lowest precedence) environment
    /// variables, the config file, and compiled-in defaults. An explicit
    /// path must exist; the default `datamart.json` is optional.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DatamartError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        let mut config: Config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| DatamartError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| DatamartError::ConfigParse(err.to_string()))?
        } else if path.is_some() {
            return Err(DatamartError::ConfigRead(config_path));
        } else {
            Config::default()
        };

        if let Some(url) = std::env::var("DATAMART_API_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            config.api_base_url = Some(url);
        }
        if let Some(secs) = std::env::var("DATAMART_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.trim().parse().ok())
        {
            config.timeout_secs = Some(secs);
        }

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, DatamartError> {
        let api_base_url = config
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let page_size = config.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(DatamartError::InvalidPageSize);
        }

        Ok(ResolvedConfig {
            api_base_url,
            timeout: Duration::from_secs(timeout_secs),
            retries: config.retries.unwrap_or(DEFAULT_RETRIES),
            page_size,
        })
    }
}
