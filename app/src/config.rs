// ==============================================================================
// config.rs - Store Configuration
// ==============================================================================
// Description: Key-value store connection settings loaded from environment
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use redis::IntoConnectionInfo;

use crate::error::AnalysisError;
use crate::store::StoreError;

pub const STORE_URL_VAR: &str = "KV_STORE_URL";
pub const STORE_TOKEN_VAR: &str = "KV_STORE_TOKEN";

/// Connection settings for the durable key-value store
#[derive(Clone)]
pub struct StoreConfig {
    url: String,
    token: String,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl StoreConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self, AnalysisError> {
        let url = url.into();
        let token = token.into();

        if url.trim().is_empty() {
            return Err(AnalysisError::Configuration(format!("{} is empty", STORE_URL_VAR)));
        }
        if token.trim().is_empty() {
            return Err(AnalysisError::Configuration(format!("{} is empty", STORE_TOKEN_VAR)));
        }

        let config = Self { url, token };
        config
            .connection_info()
            .map_err(|e| AnalysisError::Configuration(e.to_string()))?;
        Ok(config)
    }

    /// Load store URL and access token from environment.
    ///
    /// Missing credentials are a fatal startup error; the pipeline never
    /// runs without its cache.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let url = std::env::var(STORE_URL_VAR)
            .map_err(|_| AnalysisError::Configuration(format!("{} must be set", STORE_URL_VAR)))?;
        let token = std::env::var(STORE_TOKEN_VAR)
            .map_err(|_| AnalysisError::Configuration(format!("{} must be set", STORE_TOKEN_VAR)))?;

        Self::new(url, token)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connection info with the access token applied as the store password
    pub fn connection_info(&self) -> Result<redis::ConnectionInfo, StoreError> {
        let mut info = self
            .url
            .as_str()
            .into_connection_info()
            .map_err(|e| StoreError::Connection(format!("Invalid store URL: {}", e)))?;

        if info.redis.password.is_none() {
            info.redis.password = Some(self.token.clone());
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_applies_token() {
        let config = StoreConfig::new("redis://127.0.0.1:6379", "secret-token").unwrap();
        let info = config.connection_info().unwrap();
        assert_eq!(info.redis.password.as_deref(), Some("secret-token"));
    }

    #[test]
    fn test_store_config_keeps_url_password() {
        let config = StoreConfig::new("redis://:inline@127.0.0.1:6379", "secret-token").unwrap();
        let info = config.connection_info().unwrap();
        assert_eq!(info.redis.password.as_deref(), Some("inline"));
    }

    #[test]
    fn test_store_config_rejects_missing_values() {
        assert!(matches!(
            StoreConfig::new("", "token"),
            Err(AnalysisError::Configuration(_))
        ));
        assert!(matches!(
            StoreConfig::new("redis://127.0.0.1:6379", " "),
            Err(AnalysisError::Configuration(_))
        ));
        assert!(matches!(
            StoreConfig::new("not a url", "token"),
            Err(AnalysisError::Configuration(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = StoreConfig::new("redis://127.0.0.1:6379", "secret-token").unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-token"));
    }
}
