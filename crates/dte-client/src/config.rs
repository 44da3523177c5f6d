//! Collaborator configuration.
//!
//! Both clients read their settings from environment variables, with
//! defaults for everything except the authority token. Tests build the
//! structs directly against a mock server URL.

use dte_core::{Environment, Secret};
use url::Url;

/// Default signing service endpoint.
pub const DEFAULT_SIGNING_URL: &str = "https://api-firma.onrender.com/firma";

/// Default authority reception endpoint for the sandbox environment.
pub const DEFAULT_SANDBOX_MH_URL: &str = "https://apitest.dtes.mh.gob.sv/fesv/recepciondte";

/// Default authority reception endpoint for production.
pub const DEFAULT_PRODUCTION_MH_URL: &str = "https://api.dtes.mh.gob.sv/fesv/recepciondte";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Signing service settings.
///
/// Custom `Debug` redacts the token.
#[derive(Clone)]
pub struct SigningConfig {
    /// `POST` endpoint that signs a document.
    pub url: Url,
    /// Fallback bearer token when a business has none of its own.
    pub token: Option<Secret>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("url", &self.url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl SigningConfig {
    /// Load from environment variables.
    ///
    /// Variables:
    /// - `DTE_SIGNING_URL` (default: `https://api-firma.onrender.com/firma`)
    /// - `DTE_SIGNING_TOKEN` (optional)
    /// - `DTE_HTTP_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_url("DTE_SIGNING_URL", DEFAULT_SIGNING_URL)?,
            token: std::env::var("DTE_SIGNING_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .map(Secret::new),
            timeout_secs: env_timeout()?,
        })
    }

    /// Health endpoint: the signing path with `/firma` replaced by
    /// `/health`, or `/health` appended when the path has no `/firma`.
    pub fn health_url(&self) -> Url {
        let mut url = self.url.clone();
        let path = url.path().to_string();
        let health = if path.contains("/firma") {
            path.replacen("/firma", "/health", 1)
        } else {
            format!("{}/health", path.trim_end_matches('/'))
        };
        url.set_path(&health);
        url
    }
}

/// Authority endpoint settings.
///
/// Custom `Debug` redacts the token.
#[derive(Clone)]
pub struct TransmissionConfig {
    /// Reception endpoint.
    pub url: Url,
    /// Bearer token issued by the authority's auth endpoint.
    pub token: Secret,
    /// Which authority environment the endpoint belongs to.
    pub mode: Environment,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for TransmissionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransmissionConfig")
            .field("url", &self.url.as_str())
            .field("token", &"[REDACTED]")
            .field("mode", &self.mode)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TransmissionConfig {
    /// Load from environment variables.
    ///
    /// Variables:
    /// - `DTE_MH_TOKEN` (required)
    /// - `DTE_MH_MODE` (`sandbox` or `prod`, default: `sandbox`)
    /// - `DTE_MH_URL` (default: the reception endpoint for the mode)
    /// - `DTE_HTTP_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("DTE_MH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken {
                var: "DTE_MH_TOKEN",
            })?;
        let mode = match std::env::var("DTE_MH_MODE") {
            Ok(raw) => Environment::parse(&raw).map_err(|_| ConfigError::InvalidValue {
                var: "DTE_MH_MODE",
                value: raw,
            })?,
            Err(_) => Environment::Sandbox,
        };
        let default_url = match mode {
            Environment::Sandbox => DEFAULT_SANDBOX_MH_URL,
            Environment::Production => DEFAULT_PRODUCTION_MH_URL,
        };
        Ok(Self {
            url: env_url("DTE_MH_URL", default_url)?,
            token: Secret::new(token),
            mode,
            timeout_secs: env_timeout()?,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_timeout() -> Result<u64, ConfigError> {
    match std::env::var("DTE_HTTP_TIMEOUT_SECS") {
        Ok(raw) => raw
            .trim()
            .parse()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidValue {
                var: "DTE_HTTP_TIMEOUT_SECS",
                value: raw,
            }),
        Err(_) => Ok(DEFAULT_TIMEOUT_SECS),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} environment variable is required")]
    MissingToken { var: &'static str },
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_replaces_firma() {
        let cfg = SigningConfig {
            url: Url::parse(DEFAULT_SIGNING_URL).unwrap(),
            token: None,
            timeout_secs: 30,
        };
        assert_eq!(cfg.health_url().as_str(), "https://api-firma.onrender.com/health");
    }

    #[test]
    fn health_url_appends_when_no_firma() {
        let cfg = SigningConfig {
            url: Url::parse("http://127.0.0.1:9000/sign/").unwrap(),
            token: None,
            timeout_secs: 30,
        };
        assert_eq!(cfg.health_url().as_str(), "http://127.0.0.1:9000/sign/health");
    }

    #[test]
    fn debug_redacts_tokens() {
        let cfg = TransmissionConfig {
            url: Url::parse(DEFAULT_SANDBOX_MH_URL).unwrap(),
            token: Secret::new("super-secret"),
            mode: Environment::Sandbox,
            timeout_secs: 30,
        };
        let out = format!("{cfg:?}");
        assert!(out.contains("[REDACTED]"));
        assert!(!out.contains("super-secret"));

        let cfg = SigningConfig {
            url: Url::parse(DEFAULT_SIGNING_URL).unwrap(),
            token: Some(Secret::new("other-secret")),
            timeout_secs: 30,
        };
        assert!(!format!("{cfg:?}").contains("other-secret"));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("DTE_NONEXISTENT_VAR_12345", "https://example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn env_url_rejects_garbage() {
        std::env::set_var("DTE_TEST_BAD_URL_VAR", "not a url");
        let err = env_url("DTE_TEST_BAD_URL_VAR", "https://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(..)));
        std::env::remove_var("DTE_TEST_BAD_URL_VAR");
    }
}
