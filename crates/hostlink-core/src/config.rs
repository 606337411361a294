//! Shell configuration
//!
//! Defaults cover the normal desktop setup. Overrides come from a JSON
//! document or from `HOSTLINK_*` environment variables (a `.env` file is
//! honoured during development).

use serde::Deserialize;
use thiserror::Error;

use crate::application::DEFAULT_ACCOUNT_PROVIDER;
use crate::domain::OverlayTarget;
use crate::event_bus::DEFAULT_CAPACITY;

/// Environment variable names
pub mod env_keys {
    pub const ACCOUNT_PROVIDER: &str = "HOSTLINK_ACCOUNT_PROVIDER";
    pub const INSTALL_PAGE: &str = "HOSTLINK_INSTALL_PAGE";
    pub const INSTALL_TAB: &str = "HOSTLINK_INSTALL_TAB";
    pub const EVENT_BUS_CAPACITY: &str = "HOSTLINK_EVENT_BUS_CAPACITY";
    pub const DEFAULT_LANGUAGE: &str = "HOSTLINK_DEFAULT_LANGUAGE";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Model provider name of the account-backed provider
    pub account_provider: String,
    /// Where forwarded installs open
    pub install_overlay: OverlayTarget,
    pub event_bus_capacity: usize,
    /// Used when the UI reports an empty language
    pub default_language: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            account_provider: DEFAULT_ACCOUNT_PROVIDER.to_string(),
            install_overlay: OverlayTarget::tools_settings(),
            event_bus_capacity: DEFAULT_CAPACITY,
            default_language: "en".to_string(),
        }
    }
}

impl ShellConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `HOSTLINK_*` variables (loads `.env` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(provider) = get(env_keys::ACCOUNT_PROVIDER) {
            config.account_provider = provider;
        }
        if let Some(page) = get(env_keys::INSTALL_PAGE) {
            config.install_overlay.page = page;
        }
        if let Some(tab) = get(env_keys::INSTALL_TAB) {
            config.install_overlay.tab = tab;
        }
        if let Some(lang) = get(env_keys::DEFAULT_LANGUAGE) {
            config.default_language = lang;
        }
        if let Some(raw) = get(env_keys::EVENT_BUS_CAPACITY) {
            config.event_bus_capacity = match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        key: env_keys::EVENT_BUS_CAPACITY,
                        value: raw,
                    })
                }
            };
        }

        Ok(config)
    }
}
