//! Provider configuration
//!
//! Credentials and request defaults are carried in an explicit
//! [`ProviderConfig`] handed to the client at construction time.

use crate::FlightError;
use ::config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const API_KEY_ENV: &str = "RAPIDAPI_KEY";

const API_KEY_PREFIX: &str = "RAPIDAPI";
const ENV_PREFIX: &str = "SKY_FLIGHTS";

/// Connection settings for the Sky Scrapper API
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// RapidAPI key sent as `X-RapidAPI-Key`
    pub api_key: String,
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-call timeout applied to every provider request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub defaults: SearchDefaults,
}

/// Fixed passenger, currency and market parameters shared by search and detail requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDefaults {
    #[serde(default = "default_adults")]
    pub adults: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_cabin_class")]
    pub cabin_class: String,
}

fn default_api_host() -> String {
    "sky-scrapper.p.rapidapi.com".to_string()
}

fn default_base_url() -> String {
    "https://sky-scrapper.p.rapidapi.com/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_adults() -> u32 {
    1
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_market() -> String {
    "en-US".to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_country_code() -> String {
    "US".to_string()
}

fn default_cabin_class() -> String {
    "economy".to_string()
}

/// Flat view of the environment; `rapidapi_key` keeps its prefix
#[derive(Debug, Deserialize)]
struct EnvSettings {
    rapidapi_key: Option<String>,
    #[serde(default = "default_api_host")]
    api_host: String,
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default = "default_market")]
    market: String,
    #[serde(default = "default_locale")]
    locale: String,
    #[serde(default = "default_country_code")]
    country_code: String,
}

impl From<EnvSettings> for ProviderConfig {
    fn from(env: EnvSettings) -> Self {
        Self {
            api_key: env.rapidapi_key.unwrap_or_default(),
            api_host: env.api_host,
            base_url: env.base_url,
            timeout_secs: env.timeout_secs,
            defaults: SearchDefaults {
                currency: env.currency,
                market: env.market,
                locale: env.locale,
                country_code: env.country_code,
                ..SearchDefaults::default()
            },
        }
    }
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            adults: default_adults(),
            currency: default_currency(),
            market: default_market(),
            locale: default_locale(),
            country_code: default_country_code(),
            cabin_class: default_cabin_class(),
        }
    }
}

impl ProviderConfig {
    /// Create a configuration with default endpoint and search parameters
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_host: default_api_host(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            defaults: SearchDefaults::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `RAPIDAPI_KEY` is required. `SKY_FLIGHTS_BASE_URL`, `SKY_FLIGHTS_API_HOST`,
    /// `SKY_FLIGHTS_TIMEOUT_SECS`, `SKY_FLIGHTS_CURRENCY`, `SKY_FLIGHTS_MARKET`,
    /// `SKY_FLIGHTS_LOCALE` and `SKY_FLIGHTS_COUNTRY_CODE` override the defaults.
    pub fn from_env() -> Result<Self, FlightError> {
        Self::from_env_source(None)
    }

    /// Same as [`ProviderConfig::from_env`], reading from `vars` instead of the
    /// process environment when given
    fn from_env_source(vars: Option<::config::Map<String, String>>) -> Result<Self, FlightError> {
        let settings = Config::builder()
            .add_source(
                Environment::with_prefix(API_KEY_PREFIX)
                    .keep_prefix(true)
                    .source(vars.clone()),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX).source(vars))
            .build()
            .map_err(|e| FlightError::Configuration(format!("Failed to build configuration: {}", e)))?;

        let env: EnvSettings = settings
            .try_deserialize()
            .map_err(|e| FlightError::Configuration(format!("Failed to deserialize configuration: {}", e)))?;

        let config = Self::from(env);
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a working client
    pub fn validate(&self) -> Result<(), FlightError> {
        if self.api_key.trim().is_empty() {
            return Err(FlightError::Configuration(format!(
                "API key is not configured (set {})",
                API_KEY_ENV
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(FlightError::Configuration("base_url is empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(FlightError::Configuration(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.defaults.adults == 0 {
            return Err(FlightError::Configuration(
                "at least one adult passenger is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("api_host", &self.api_host)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("defaults", &self.defaults)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_provider_expectations() {
        let config = ProviderConfig::new("key");
        assert_eq!(config.defaults.adults, 1);
        assert_eq!(config.defaults.currency, "USD");
        assert_eq!(config.defaults.market, "en-US");
        assert_eq!(config.defaults.country_code, "US");
        assert_eq!(config.defaults.cabin_class, "economy");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let config = ProviderConfig::new("   ");
        assert!(matches!(config.validate(), Err(FlightError::Configuration(_))));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = ProviderConfig::new("key");
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProviderConfig::new("super-secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    fn vars(pairs: &[(&str, &str)]) -> ::config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = ProviderConfig::from_env_source(Some(vars(&[
            ("RAPIDAPI_KEY", "env-key"),
            ("SKY_FLIGHTS_CURRENCY", "EUR"),
            ("SKY_FLIGHTS_COUNTRY_CODE", "TR"),
            ("SKY_FLIGHTS_TIMEOUT_SECS", "5"),
            ("SKY_FLIGHTS_BASE_URL", "http://localhost:8080/api"),
        ])))
        .unwrap();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.defaults.currency, "EUR");
        assert_eq!(config.defaults.country_code, "TR");
        assert_eq!(config.defaults.market, "en-US");
        assert_eq!(config.defaults.adults, 1);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.api_host, "sky-scrapper.p.rapidapi.com");
    }

    #[test]
    fn test_env_without_key_is_rejected() {
        let result = ProviderConfig::from_env_source(Some(vars(&[("SKY_FLIGHTS_CURRENCY", "EUR")])));
        match result {
            Err(FlightError::Configuration(message)) => assert!(message.contains(API_KEY_ENV)),
            other => panic!("expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_env_bad_timeout_is_rejected() {
        let result = ProviderConfig::from_env_source(Some(vars(&[
            ("RAPIDAPI_KEY", "env-key"),
            ("SKY_FLIGHTS_TIMEOUT_SECS", "soon"),
        ])));
        assert!(matches!(result, Err(FlightError::Configuration(_))));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: ProviderConfig = serde_json::from_str(r#"{"api_key": "k"}"#).unwrap();
        assert_eq!(config.api_host, "sky-scrapper.p.rapidapi.com");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.defaults, SearchDefaults::default());
    }
}
