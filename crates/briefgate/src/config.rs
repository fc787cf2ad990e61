//! Configuration management for briefgate.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "briefgate";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "briefgate.db";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BRIEFGATE_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `BRIEFGATE_`, tables split on `__`)
/// 2. TOML config file at `~/.config/briefgate/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General application settings.
    pub app: AppConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Brief API configuration.
    pub api: ApiConfig,
    /// Outbound webhook configuration.
    pub webhooks: WebhookConfig,
    /// Credentials and endpoints that must not be logged.
    pub secrets: SecretsConfig,
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Display name used in CLI output.
    pub name: String,
    /// IANA timezone that defines weeks and code expiry.
    pub timezone: String,
    /// Credits granted to a user on first login.
    pub default_free_credits: i64,
    /// Number of runs kept in each user's history.
    pub history_limit: usize,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/briefgate/briefgate.db`
    pub database_path: Option<PathBuf>,
}

/// Perplexity chat-completions settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Chat completions endpoint.
    pub endpoint: String,
    /// Model used when the run does not name one.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Completion token cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Recency window for web search results.
    pub search_recency: String,
    /// Amount of search context the API should pull in.
    pub search_context_size: String,
}

/// Outbound webhook settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

/// Secrets. All optional at load time; operations that need one fail with
/// [`Error::MissingSecret`].
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Webhook receiving access requests.
    pub signup_webhook_url: Option<String>,
    /// Webhook receiving contact-owner messages.
    pub contact_webhook_url: Option<String>,
    /// Owner email for the admin bypass login.
    pub owner_email: Option<String>,
    /// Owner access code for the admin bypass login.
    pub owner_access_code: Option<String>,
    /// Password that unlocks admin tools.
    pub admin_password: Option<String>,
    /// Perplexity API key.
    pub api_key: Option<String>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(value: Option<&String>) -> &'static str {
            if value.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("SecretsConfig")
            .field("signup_webhook_url", &mask(self.signup_webhook_url.as_ref()))
            .field(
                "contact_webhook_url",
                &mask(self.contact_webhook_url.as_ref()),
            )
            .field("owner_email", &mask(self.owner_email.as_ref()))
            .field("owner_access_code", &mask(self.owner_access_code.as_ref()))
            .field("admin_password", &mask(self.admin_password.as_ref()))
            .field("api_key", &mask(self.api_key.as_ref()))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Strategic Account Intelligence Agent".to_string(),
            timezone: "America/New_York".to_string(),
            default_free_credits: 2,
            history_limit: 25,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.perplexity.ai/chat/completions".to_string(),
            model: "sonar".to_string(),
            timeout_secs: 60,
            max_tokens: 1400,
            temperature: 0.2,
            search_recency: "month".to_string(),
            search_context_size: "low".to_string(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { timeout_secs: 12 }
    }
}

/// Return the secret or fail naming it.
fn require<'a>(value: Option<&'a String>, key: &'static str) -> Result<&'a str> {
    match value.map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::MissingSecret { key }),
    }
}

impl SecretsConfig {
    /// Signup webhook URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] if it is not configured.
    pub fn signup_webhook_url(&self) -> Result<&str> {
        require(self.signup_webhook_url.as_ref(), "signup_webhook_url")
    }

    /// Contact webhook URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] if it is not configured.
    pub fn contact_webhook_url(&self) -> Result<&str> {
        require(self.contact_webhook_url.as_ref(), "contact_webhook_url")
    }

    /// Owner email.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] if it is not configured.
    pub fn owner_email(&self) -> Result<&str> {
        require(self.owner_email.as_ref(), "owner_email")
    }

    /// Owner access code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] if it is not configured.
    pub fn owner_access_code(&self) -> Result<&str> {
        require(self.owner_access_code.as_ref(), "owner_access_code")
    }

    /// Admin password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] if it is not configured.
    pub fn admin_password(&self) -> Result<&str> {
        require(self.admin_password.as_ref(), "admin_password")
    }

    /// Perplexity API key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] if it is not configured.
    pub fn api_key(&self) -> Result<&str> {
        require(self.api_key.as_ref(), "api_key")
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `BRIEFGATE_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        self.timezone()?;

        if self.app.history_limit == 0 {
            return Err(Error::ConfigValidation {
                message: "history_limit must be greater than 0".to_string(),
            });
        }

        if self.app.default_free_credits < 0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "default_free_credits ({}) cannot be negative",
                    self.app.default_free_credits
                ),
            });
        }

        if self.api.timeout_secs == 0 || self.webhooks.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }

        if !(0.0..=2.0).contains(&self.api.temperature) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "temperature ({}) must be between 0 and 2",
                    self.api.temperature
                ),
            });
        }

        Ok(())
    }

    /// Parse the configured timezone.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a known IANA timezone.
    pub fn timezone(&self) -> Result<Tz> {
        self.app
            .timezone
            .parse::<Tz>()
            .map_err(|_| Error::ConfigValidation {
                message: format!("unknown timezone: {}", self.app.timezone),
            })
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the webhook timeout as a Duration.
    #[must_use]
    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhooks.timeout_secs)
    }

    /// A copy of this configuration with every secret value masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |value: &Option<String>| value.as_ref().map(|_| "********".to_string());
        let mut copy = self.clone();
        copy.secrets = SecretsConfig {
            signup_webhook_url: mask(&self.secrets.signup_webhook_url),
            contact_webhook_url: mask(&self.secrets.contact_webhook_url),
            owner_email: mask(&self.secrets.owner_email),
            owner_access_code: mask(&self.secrets.owner_access_code),
            admin_password: mask(&self.secrets.admin_password),
            api_key: mask(&self.secrets.api_key),
        };
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.app.default_free_credits, 2);
        assert_eq!(config.app.history_limit, 25);
        assert_eq!(config.app.timezone, "America/New_York");
        assert_eq!(config.api.model, "sonar");
        assert_eq!(config.webhooks.timeout_secs, 12);
    }

    #[test]
    fn test_default_api_config() {
        let api = ApiConfig::default();

        assert_eq!(api.endpoint, "https://api.perplexity.ai/chat/completions");
        assert_eq!(api.timeout_secs, 60);
        assert_eq!(api.max_tokens, 1400);
        assert_eq!(api.search_recency, "month");
        assert_eq!(api.search_context_size, "low");
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_timezone() {
        let mut config = Config::default();
        config.app.timezone = "Mars/Olympus_Mons".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("unknown timezone"));
    }

    #[test]
    fn test_validate_zero_history_limit() {
        let mut config = Config::default();
        config.app.history_limit = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("history_limit"));
    }

    #[test]
    fn test_validate_negative_credits() {
        let mut config = Config::default();
        config.app.default_free_credits = -1;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.webhooks.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_temperature_range() {
        let mut config = Config::default();
        config.api.temperature = 3.5;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("temperature"));
    }

    #[test]
    fn test_timezone_parses() {
        let config = Config::default();
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::New_York);
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("briefgate.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_timeouts() {
        let config = Config::default();
        assert_eq!(config.api.timeout(), Duration::from_secs(60));
        assert_eq!(config.webhook_timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_missing_secret() {
        let secrets = SecretsConfig::default();
        let err = secrets.owner_email().unwrap_err();
        assert!(matches!(err, Error::MissingSecret { key: "owner_email" }));
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let secrets = SecretsConfig {
            api_key: Some("   ".to_string()),
            ..SecretsConfig::default()
        };
        assert!(secrets.api_key().is_err());
    }

    #[test]
    fn test_present_secret_is_trimmed() {
        let secrets = SecretsConfig {
            admin_password: Some(" hunter2 ".to_string()),
            ..SecretsConfig::default()
        };
        assert_eq!(secrets.admin_password().unwrap(), "hunter2");
    }

    #[test]
    fn test_secrets_debug_is_masked() {
        let secrets = SecretsConfig {
            api_key: Some("pplx-very-secret".to_string()),
            ..SecretsConfig::default()
        };
        let debug_str = format!("{secrets:?}");
        assert!(!debug_str.contains("pplx-very-secret"));
        assert!(debug_str.contains("<set>"));
        assert!(debug_str.contains("<unset>"));
    }

    #[test]
    fn test_redacted_masks_values() {
        let mut config = Config::default();
        config.secrets.owner_access_code = Some("KBUILDS".to_string());

        let redacted = config.redacted();
        let json = serde_json::to_string(&redacted).unwrap();
        assert!(!json.contains("KBUILDS"));
        assert_eq!(
            redacted.secrets.owner_access_code.as_deref(),
            Some("********")
        );
        assert!(redacted.secrets.api_key.is_none());
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("briefgate"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = std::env::temp_dir().join(format!(
            "briefgate_config_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[app]\nhistory_limit = 5\n\n[api]\nmodel = \"sonar-pro\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.app.history_limit, 5);
        assert_eq!(config.api.model, "sonar-pro");
        assert_eq!(config.app.default_free_credits, 2);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_app_config_deserialize() {
        let json = r#"{"default_free_credits": 5}"#;
        let app: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(app.default_free_credits, 5);
        assert_eq!(app.history_limit, 25);
    }
}
