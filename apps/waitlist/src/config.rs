use std::{fs, path::Path, time::Duration};

use client_core::{DeliveryMode, GatewayConfig};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no waitlist endpoint configured and require_endpoint is set")]
    MissingEndpoint,
    #[error("invalid waitlist endpoint '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        source: url::ParseError,
    },
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// No built-in default: the deployment decides where entries go.
    pub endpoint_url: Option<String>,
    pub require_endpoint: bool,
    pub delivery_mode: DeliveryMode,
    pub cache_database_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            require_endpoint: false,
            delivery_mode: DeliveryMode::Observed,
            cache_database_url: "sqlite://./data/waitlist_cache.db".into(),
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    endpoint_url: Option<String>,
    require_endpoint: Option<bool>,
    delivery_mode: Option<DeliveryMode>,
    cache_database_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

impl Settings {
    /// Resolves the gateway configuration, enforcing the endpoint policy.
    pub fn gateway_config(&self) -> Result<GatewayConfig, SettingsError> {
        if self.request_timeout_secs == 0 {
            return Err(SettingsError::ZeroTimeout);
        }
        let endpoint = match self.endpoint_url.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                Some(Url::parse(raw).map_err(|source| SettingsError::InvalidEndpoint {
                    url: raw.to_string(),
                    source,
                })?)
            }
            _ if self.require_endpoint => return Err(SettingsError::MissingEndpoint),
            _ => {
                warn!("no waitlist endpoint configured; submissions will only reach the local cache");
                None
            }
        };

        Ok(GatewayConfig {
            endpoint,
            mode: self.delivery_mode,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let file = fs::read_to_string(path).ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

/// Layers defaults, then the TOML file, then environment variables.
pub(crate) fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.endpoint_url {
                    settings.endpoint_url = Some(v);
                }
                if let Some(v) = file_cfg.require_endpoint {
                    settings.require_endpoint = v;
                }
                if let Some(v) = file_cfg.delivery_mode {
                    settings.delivery_mode = v;
                }
                if let Some(v) = file_cfg.cache_database_url {
                    settings.cache_database_url = v;
                }
                match file_cfg.request_timeout_secs {
                    Some(0) => warn!("ignoring zero request_timeout_secs"),
                    Some(v) => settings.request_timeout_secs = v,
                    None => {}
                }
            }
            Err(error) => warn!(%error, "ignoring unreadable waitlist config file"),
        }
    }

    for key in ["WAITLIST_ENDPOINT_URL", "APP__ENDPOINT_URL"] {
        if let Some(v) = env(key) {
            settings.endpoint_url = Some(v);
        }
    }

    if let Some(v) = env("WAITLIST_REQUIRE_ENDPOINT") {
        match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => settings.require_endpoint = true,
            "0" | "false" | "no" => settings.require_endpoint = false,
            other => warn!(value = other, "ignoring WAITLIST_REQUIRE_ENDPOINT"),
        }
    }

    if let Some(v) = env("WAITLIST_DELIVERY_MODE") {
        match v.parse() {
            Ok(mode) => settings.delivery_mode = mode,
            Err(error) => warn!(%error, "ignoring WAITLIST_DELIVERY_MODE"),
        }
    }

    if let Some(v) = env("WAITLIST_CACHE_DATABASE_URL") {
        settings.cache_database_url = v;
    }

    if let Some(v) = env("WAITLIST_REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) if parsed > 0 => settings.request_timeout_secs = parsed,
            _ => warn!(value = %v, "ignoring WAITLIST_REQUEST_TIMEOUT_SECS"),
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
