//! Client configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. A TOML document, when the embedding application has one
//! 3. Environment variables (PETS_* prefix)
//!
//! Environment variables take precedence over TOML values.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::client::{PetClient, UpdateMethod};
use crate::error::ConfigError;
use crate::remote::RemoteStore;
use crate::transport::{UreqTransport, DEFAULT_BODY_LIMIT};

/// Environment variable prefix
const ENV_PREFIX: &str = "PETS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the backend; the `pets` resource hangs off it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whole-request timeout in seconds. None waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub update_method: UpdateMethod,

    /// Cap on a single response body, in bytes
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
            update_method: UpdateMethod::default(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl Config {
    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a TOML string, then apply environment overrides.
    pub fn load_from_str(toml_content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml_content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply the PETS_* overrides from `lookup`.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup(&format!("{ENV_PREFIX}_API_URL")) {
            if !val.is_empty() {
                self.base_url = val;
            }
        }

        let key = format!("{ENV_PREFIX}_TIMEOUT_SECS");
        if let Some(val) = lookup(&key) {
            self.timeout_secs = if val.is_empty() {
                None
            } else {
                Some(val.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.clone(),
                    value: val.clone(),
                })?)
            };
        }

        let key = format!("{ENV_PREFIX}_UPDATE_METHOD");
        if let Some(val) = lookup(&key) {
            self.update_method = val
                .parse()
                .map_err(|value| ConfigError::InvalidValue { key, value })?;
        }

        let key = format!("{ENV_PREFIX}_MAX_RESPONSE_BYTES");
        if let Some(val) = lookup(&key) {
            self.max_response_bytes = val
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: val })?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn client(&self) -> PetClient {
        PetClient::new(&self.base_url).with_update_method(self.update_method)
    }

    pub fn transport(&self) -> UreqTransport {
        UreqTransport::with_timeout(self.timeout()).with_body_limit(self.max_response_bytes)
    }

    /// A catalog talking to the configured backend over HTTP.
    pub fn catalog(&self) -> Catalog<UreqTransport> {
        Catalog::new(RemoteStore::new(self.client(), self.transport()))
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_max_response_bytes() -> u64 {
    DEFAULT_BODY_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.timeout(), None);
        assert_eq!(config.update_method, UpdateMethod::Put);
        assert_eq!(config.transport().body_limit(), DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn toml_fields_override_defaults() {
        let config: Config = toml::from_str(
            r#"
            base_url = "https://pets.example.com/api/"
            timeout_secs = 5
            update_method = "patch"
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.update_method, UpdateMethod::Patch);
        assert_eq!(config.client().base_url(), "https://pets.example.com/api");
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn env_overrides_win() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("PETS_API_URL", "http://10.0.0.2:8080"),
                ("PETS_TIMEOUT_SECS", "30"),
                ("PETS_UPDATE_METHOD", "PATCH"),
                ("PETS_MAX_RESPONSE_BYTES", "1048576"),
            ]))
            .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:8080");
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.update_method, UpdateMethod::Patch);
        assert_eq!(config.transport().body_limit(), 1_048_576);
    }

    #[test]
    fn bad_env_value_is_reported() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(lookup(&[("PETS_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("PETS_TIMEOUT_SECS"));
    }

    #[test]
    fn malformed_toml_is_reported() {
        assert!(matches!(
            Config::load_from_str("timeout_secs = \"x\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
