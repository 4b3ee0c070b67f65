//! Configuration management for Omnicast

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::types::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auto_publish: AutoPublishConfig,
    /// Per-platform publish commands for `omni-send` (content on stdin,
    /// platform post id on stdout)
    #[serde(default)]
    pub publishers: HashMap<Platform, PublisherCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherCommand {
    pub command: String,
}

/// Configuration for the auto-publish loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoPublishConfig {
    pub enabled: bool,
    /// Minutes between queue scans
    pub check_interval: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Platforms the loop will publish to; posts for other platforms stay
    /// queued untouched
    #[serde(default = "all_platforms")]
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Minutes before the first retry
    pub retry_delay: u64,
    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub on_success: bool,
    #[serde(default)]
    pub on_failure: bool,
    #[serde(default)]
    pub channels: Vec<NotifyChannel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannel {
    Email,
    Slack,
    Webhook,
}

impl std::fmt::Display for NotifyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Slack => write!(f, "slack"),
            Self::Webhook => write!(f, "webhook"),
        }
    }
}

fn all_platforms() -> Vec<Platform> {
    Platform::all().to_vec()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: 5,
            backoff_multiplier: 2.0,
        }
    }
}

impl Default for AutoPublishConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval: 5,
            retry: RetryConfig::default(),
            notifications: NotificationConfig::default(),
            platforms: all_platforms(),
        }
    }
}

impl AutoPublishConfig {
    /// Validate option constraints
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero check interval, a zero
    /// retry delay, or a backoff multiplier below 1.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval == 0 {
            return Err(ConfigError::InvalidValue(
                "check_interval must be greater than 0 minutes".to_string(),
            )
            .into());
        }
        if self.retry.retry_delay == 0 {
            return Err(ConfigError::InvalidValue(
                "retry.retry_delay must be greater than 0 minutes".to_string(),
            )
            .into());
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::InvalidValue(format!(
                "retry.backoff_multiplier must be at least 1 (got {})",
                self.retry.backoff_multiplier
            ))
            .into());
        }
        Ok(())
    }

    pub fn is_enabled(&self, platform: Platform) -> bool {
        self.platforms.contains(&platform)
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.auto_publish.validate()?;
        Ok(config)
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            database: DatabaseConfig {
                path: "~/.local/share/omnicast/posts.db".to_string(),
            },
            auto_publish: AutoPublishConfig::default(),
            publishers: HashMap::new(),
        }
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("OMNICAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("omnicast").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AutoPublishConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.enabled);
        assert_eq!(config.check_interval, 5);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.platforms.len(), Platform::all().len());
    }

    #[test]
    fn test_validate_rejects_zero_check_interval() {
        let config = AutoPublishConfig {
            check_interval: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("check_interval"));
    }

    #[test]
    fn test_validate_rejects_zero_retry_delay() {
        let mut config = AutoPublishConfig::default();
        config.retry.retry_delay = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry_delay"));
    }

    #[test]
    fn test_validate_rejects_multiplier_below_one() {
        let mut config = AutoPublishConfig::default();
        config.retry.backoff_multiplier = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backoff_multiplier"));
    }

    #[test]
    fn test_validate_accepts_zero_max_retries() {
        let mut config = AutoPublishConfig::default();
        config.retry.max_retries = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_enabled_respects_platform_set() {
        let config = AutoPublishConfig {
            platforms: vec![Platform::Twitter, Platform::Linkedin],
            ..Default::default()
        };
        assert!(config.is_enabled(Platform::Twitter));
        assert!(!config.is_enabled(Platform::Tiktok));
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [database]
            path = "/tmp/omnicast/posts.db"

            [auto_publish]
            enabled = true
            check_interval = 10
            platforms = ["twitter", "instagram"]

            [auto_publish.retry]
            max_retries = 2
            retry_delay = 15
            backoff_multiplier = 1.5

            [auto_publish.notifications]
            on_success = true
            on_failure = true
            channels = ["slack", "webhook"]

            [publishers.twitter]
            command = "post-to-twitter"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database.path, "/tmp/omnicast/posts.db");
        assert_eq!(config.auto_publish.check_interval, 10);
        assert_eq!(
            config.auto_publish.platforms,
            vec![Platform::Twitter, Platform::Instagram]
        );
        assert_eq!(config.auto_publish.retry.max_retries, 2);
        assert_eq!(
            config.auto_publish.notifications.channels,
            vec![NotifyChannel::Slack, NotifyChannel::Webhook]
        );
        assert_eq!(
            config.publishers.get(&Platform::Twitter).unwrap().command,
            "post-to-twitter"
        );
    }

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let toml_str = r#"
            [database]
            path = ":memory:"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.auto_publish.enabled);
        assert_eq!(config.auto_publish.retry.max_retries, 3);
        assert!(config.publishers.is_empty());
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = Config::load_from_path(&PathBuf::from("/nonexistent/omnicast.toml"));
        assert!(matches!(
            result,
            Err(crate::error::OmnicastError::Config(ConfigError::ReadError(_)))
        ));
    }
}
