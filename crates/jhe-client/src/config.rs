//! Client configuration from defaults, `JHE_*` environment variables and
//! explicit overrides, in increasing precedence.

use config::{Config, Environment};
use serde::Deserialize;
use url::Url;

use crate::error::{ClientError, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Connection settings for an exchange instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the exchange, e.g. `https://jhe.example.org`.
    pub url: String,
    /// Bearer token; requests are anonymous without one.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Values that take precedence over the environment, e.g. CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub page_size: Option<u32>,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Load from `JHE_URL`, `JHE_TOKEN` and `JHE_PAGE_SIZE`.
    pub fn from_env() -> Result<Self> {
        Self::load(ConfigOverrides::default())
    }

    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let builder = Config::builder()
            .set_default("page_size", i64::from(DEFAULT_PAGE_SIZE))?
            .add_source(Environment::with_prefix("JHE"))
            .set_override_option("url", overrides.url)?
            .set_override_option("token", overrides.token)?
            .set_override_option("page_size", overrides.page_size.map(i64::from))?;

        let cfg = builder.build()?;
        if cfg.get_string("url").is_err() {
            return Err(ClientError::configuration(
                "No exchange URL configured. Set JHE_URL or pass --url",
            ));
        }

        let loaded: ClientConfig = cfg.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check the settings and return the parsed base URL.
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::configuration(format!(
                "Exchange URL must be http(s), got {}",
                self.url
            )));
        }
        if url.cannot_be_a_base() {
            return Err(ClientError::configuration(format!(
                "Exchange URL cannot be used as a base: {}",
                self.url
            )));
        }
        if self.page_size == 0 {
            return Err(ClientError::configuration("page_size must be positive"));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_default_page_size() {
        let cfg = ClientConfig::new("https://jhe.example.org", Some("abc".into()));
        assert_eq!(cfg.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(cfg.validate().unwrap().as_str(), "https://jhe.example.org/");
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(ClientConfig::new("ftp://jhe.example.org", None).validate().is_err());
        assert!(ClientConfig::new("mailto:someone@example.org", None).validate().is_err());
        assert!(ClientConfig::new("not a url", None).validate().is_err());
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let mut cfg = ClientConfig::new("https://jhe.example.org", None);
        cfg.page_size = 0;
        assert!(cfg.validate().is_err());
    }
}
