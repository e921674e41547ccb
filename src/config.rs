// src/config.rs

use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use crate::error::PayrollError;
use crate::session::AuthContract;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SESSION_FILE: &str = "crewpay_session.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const ENV_PREFIX: &str = "CREWPAY_";

/// Client settings, read from `CREWPAY_*` environment variables (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub auth_contract: AuthContract,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from(DEFAULT_SESSION_FILE)
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            auth_contract: AuthContract::default(),
            session_file: default_session_file(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, PayrollError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let config = envy::prefixed(ENV_PREFIX)
            .from_env::<ClientConfig>()
            .map_err(|e| PayrollError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PayrollError> {
        let url = Url::parse(&self.api_base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PayrollError::Config(format!(
                "api_base_url must be http(s), got '{}'",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(PayrollError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for `format!("{}{}", base, path)`.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), "http://localhost:5000/api");
        assert_eq!(config.auth_contract, AuthContract::Auth);
        assert_eq!(config.session_file, PathBuf::from("crewpay_session.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = ClientConfig {
            api_base_url: "https://payroll.example.com/api/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "https://payroll.example.com/api");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let config = ClientConfig {
            api_base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PayrollError::Config(_))));
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let config = ClientConfig {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PayrollError::UrlParse(_))));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PayrollError::Config(_))));
    }
}
