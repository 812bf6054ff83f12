use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the viewer application redirects are built against.
    #[serde(default = "default_base_target_url")]
    pub base_target_url: String,
    /// Delay between polling attempts on the filter page.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Attempt ceiling; with the default interval this bounds the total
    /// wait to five minutes.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Query parameter on the filter page carrying the percent-encoded
    /// original destination.
    #[serde(default = "default_source_query_param")]
    pub source_query_param: String,
    /// CSS selector for the filter-page container whose first link holds
    /// the original destination.
    #[serde(default = "default_dom_container_selector")]
    pub dom_container_selector: String,
    /// Substring identifying a filter/block page URL.
    #[serde(default = "default_filter_page_marker")]
    pub filter_page_marker: String,
    /// Lowercase substring a page-text URL must contain to count as the
    /// intercepted destination.
    #[serde(default = "default_destination_marker")]
    pub destination_marker: String,
}

fn default_base_target_url() -> String {
    "https://skyoutube.pages.dev".to_string()
}

fn default_interval_ms() -> u64 {
    250
}

fn default_max_attempts() -> u32 {
    1200
}

fn default_source_query_param() -> String {
    "url".to_string()
}

fn default_dom_container_selector() -> String {
    "div.block-url".to_string()
}

fn default_filter_page_marker() -> String {
    "/block-page".to_string()
}

fn default_destination_marker() -> String {
    "youtu".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_target_url: default_base_target_url(),
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            source_query_param: default_source_query_param(),
            dom_container_selector: default_dom_container_selector(),
            filter_page_marker: default_filter_page_marker(),
            destination_marker: default_destination_marker(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("vredirect")
}

fn config_path() -> PathBuf {
    config_dir().join("config.yml")
}

pub fn get_config() -> Result<Config, ConfigError> {
    let path = config_path();
    if path.exists() {
        let contents = fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

pub fn save_config(config: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}
