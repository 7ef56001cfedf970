//! Store endpoint configuration.

use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::Path,
};
use url::Url;

use crate::error::Result;

/// Environment variable that overrides the configured bearer token, so
/// credentials can stay out of the config file.
pub const TOKEN_ENV_VAR: &str = "FORMATO_STORE_TOKEN";

/// Connection settings for the format-association store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root of the REST API. Must end with a trailing slash for endpoint
    /// paths to join onto it.
    pub base_url: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl StoreConfig {
    pub fn new(base_url: Url) -> Self {
        StoreConfig {
            base_url,
            bearer_token: None,
        }
    }

    /// Read the config from a TOML file, then apply the
    /// [`TOKEN_ENV_VAR`] override if it is set.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        tracing::debug!("Reading store config from {:?}", path.as_ref());
        let content = read_to_string(path)?;
        let mut config: StoreConfig = toml::from_str(&content)?;
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            config.bearer_token = Some(token);
        }
        Ok(config)
    }

    /// Persist the config. The bearer token is written only when it was set
    /// explicitly rather than injected from the environment.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        tracing::debug!("Writing store config to {:?}", path.as_ref());
        let toml_string = toml::to_string(self)?;
        write(path, toml_string)?;
        Ok(())
    }
}
