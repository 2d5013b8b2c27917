//! Application configuration.
//!
//! Non-secret settings come from `config.toml`; every section and field has a
//! default so a missing file still yields a runnable configuration. API keys
//! and signing secrets are only read from the environment (or `.env`).

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Hosted checkout settings
    pub payments: PaymentsConfig,
    /// Object storage settings
    pub storage: StorageConfig,
    /// Transactional email settings
    pub email: EmailConfig,
    /// Categories created on startup when missing
    pub categories: Vec<CategorySeed>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind, overridable with `BIND_ADDRESS`
    pub bind_address: String,
    /// Public origin used to build redirect and email links
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            public_url: "http://localhost:3000".to_string(),
        }
    }
}

/// Hosted checkout settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Default currency for new courses
    pub currency: String,
    /// Provider API origin
    pub api_base: String,
    /// Path on `public_url` the provider redirects to after payment
    pub success_path: String,
    /// Path on `public_url` the provider redirects to on cancel
    pub cancel_path: String,
    /// Maximum age of a webhook signature timestamp
    pub webhook_tolerance_secs: i64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            api_base: "https://api.stripe.com".to_string(),
            success_path: "/checkout/success".to_string(),
            cancel_path: "/checkout/cancel".to_string(),
            webhook_tolerance_secs: 300,
        }
    }
}

/// Object storage settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Origin that serves stored objects
    pub base_url: String,
    /// Lifetime of signed URLs
    pub url_ttl_secs: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://media.localhost".to_string(),
            url_ttl_secs: 3600,
        }
    }
}

/// Transactional email settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Provider API origin
    pub api_base: String,
    /// Sender address
    pub from: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.resend.com".to_string(),
            from: "Coursehub <no-reply@coursehub.local>".to_string(),
        }
    }
}

/// Configuration for a single seeded category
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySeed {
    /// Display name
    pub name: String,
    /// Slug; derived from the name when omitted
    pub slug: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file falls back to defaults; a file that exists but cannot be
    /// parsed is a configuration error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        tracing::debug!("Attempting to load configuration from: {:?}", path_ref);

        if !path_ref.exists() {
            tracing::warn!("{:?} not found, using default configuration", path_ref);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
            message: format!("Failed to read config file {path_ref:?}: {e}"),
        })?;
        Self::parse(&contents).map_err(|e| Error::Config {
            message: format!("Failed to parse {path_ref:?}: {e}"),
        })
    }

    /// Parses configuration from TOML text.
    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Builds an absolute URL on the public origin.
    #[must_use]
    pub fn public_link(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server.public_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Secrets read from the environment. Never logged.
#[derive(Clone)]
pub struct Secrets {
    /// Bearer key for the payment provider API
    pub payment_secret_key: String,
    /// Shared secret for webhook signatures
    pub payment_webhook_secret: String,
    /// Key for signing storage URLs
    pub storage_signing_key: String,
    /// Email provider key; mail is only logged when absent
    pub email_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("email_api_key", &self.email_api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl Secrets {
    /// Reads all secrets from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads secrets through an arbitrary lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config {
                    message: format!("{key} must be set"),
                })
        };

        Ok(Self {
            payment_secret_key: lookup("PAYMENT_SECRET_KEY").unwrap_or_default(),
            payment_webhook_secret: required("PAYMENT_WEBHOOK_SECRET")?,
            storage_signing_key: required("STORAGE_SIGNING_KEY")?,
            email_api_key: lookup("EMAIL_API_KEY").filter(|v| !v.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_address = "127.0.0.1:8080"
            public_url = "https://learn.example.com/"

            [payments]
            currency = "EUR"
            webhook_tolerance_secs = 60

            [storage]
            base_url = "https://cdn.example.com"

            [[categories]]
            name = "Web Development"

            [[categories]]
            name = "Data"
            slug = "data-science"
            description = "Numbers"
        "#;

        let config = AppConfig::parse(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.payments.currency, "EUR");
        assert_eq!(config.payments.webhook_tolerance_secs, 60);
        // Unset fields in a present section still default
        assert_eq!(config.payments.success_path, "/checkout/success");
        assert_eq!(config.storage.url_ttl_secs, 3600);
        assert_eq!(config.categories.len(), 2);
        assert!(config.categories[0].slug.is_none());
        assert_eq!(config.categories[1].slug.as_deref(), Some("data-science"));
        assert_eq!(
            config.public_link("/courses/rust"),
            "https://learn.example.com/courses/rust"
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:3000");
        assert_eq!(config.payments.currency, "USD");
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load("definitely/not/here.toml").unwrap();
        assert_eq!(config.payments.webhook_tolerance_secs, 300);
    }

    #[test]
    fn test_malformed_config_is_rejected() {
        assert!(AppConfig::parse("[server\nbind_address = 1").is_err());
    }

    #[test]
    fn test_secrets_require_signing_keys() {
        let mut env = HashMap::new();
        env.insert("PAYMENT_WEBHOOK_SECRET", "whsec_test".to_string());

        let result = Secrets::from_lookup(|k| env.get(k).cloned());
        assert!(matches!(result, Err(Error::Config { .. })));

        env.insert("STORAGE_SIGNING_KEY", "storage".to_string());
        env.insert("EMAIL_API_KEY", "  ".to_string());
        let secrets = Secrets::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(secrets.payment_webhook_secret, "whsec_test");
        assert!(secrets.payment_secret_key.is_empty());
        assert!(secrets.email_api_key.is_none());
        assert!(!format!("{secrets:?}").contains("whsec_test"));
    }
}
