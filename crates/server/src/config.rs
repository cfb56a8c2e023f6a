use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    /// Also the shared secret for webhook signatures
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
    /// Public URL Twilio posts inbound SMS to. When unset it is rebuilt from
    /// the request's Host and X-Forwarded-Proto headers.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_translation_api_url")]
    pub api_url: String,
    /// Empty disables the engine: detection resolves to English and
    /// translation requests fail.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_translation_model")]
    pub model: String,
    #[serde(default = "default_translation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Base unit of the linear backoff between delivery attempts
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

fn default_twilio_api_base() -> String { "https://api.twilio.com".to_string() }
fn default_translation_api_url() -> String { "https://api.anthropic.com".to_string() }
fn default_translation_model() -> String { "claude-3-haiku-20240307".to_string() }
fn default_translation_timeout() -> u64 { 30 }
fn default_backoff_unit_ms() -> u64 { 1000 }

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: default_twilio_api_base(),
            webhook_url: None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_url: default_translation_api_url(),
            api_key: String::new(),
            model: default_translation_model(),
            timeout_secs: default_translation_timeout(),
        }
    }
}

impl TranslationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

impl DeliveryConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                path: "./data/hotline.db".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                token_expiry_hours: 24,
            },
            twilio: TwilioConfig::default(),
            translation: TranslationConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl Config {
    /// Load from an explicit path, `$HOTLINE_CONFIG`, or the default
    /// locations, then apply secrets from the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::load_file(explicit)?;
        config.apply_env();
        Ok(config)
    }

    fn load_file(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        if let Ok(path) = std::env::var("HOTLINE_CONFIG") {
            return Self::load_from_path(&PathBuf::from(path));
        }

        let default_paths = vec![
            PathBuf::from("hotline-server.toml"),
            PathBuf::from("config/hotline-server.toml"),
            PathBuf::from("/etc/hotline/server.toml"),
        ];

        for path in default_paths {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        tracing::warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env(&mut self) {
        let overrides: [(&str, &mut String); 5] = [
            ("HOTLINE_JWT_SECRET", &mut self.auth.jwt_secret),
            ("TWILIO_ACCOUNT_SID", &mut self.twilio.account_sid),
            ("TWILIO_AUTH_TOKEN", &mut self.twilio.auth_token),
            ("TWILIO_PHONE_NUMBER", &mut self.twilio.from_number),
            ("ANTHROPIC_API_KEY", &mut self.translation.api_key),
        ];
        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    *slot = value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_fills_optional_sections() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            path = "/tmp/hotline.db"

            [auth]
            jwt_secret = "s3cret"
            token_expiry_hours = 12
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.twilio.api_base, "https://api.twilio.com");
        assert!(config.twilio.webhook_url.is_none());
        assert_eq!(config.translation.model, "claude-3-haiku-20240307");
        assert_eq!(config.translation.timeout(), Duration::from_secs(30));
        assert_eq!(config.delivery.backoff_unit(), Duration::from_millis(1000));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            path = "hotline.db"

            [auth]
            jwt_secret = "x"
            token_expiry_hours = 1

            [twilio]
            auth_token = "tok"
            webhook_url = "https://hotline.example.org/api/webhook"

            [delivery]
            backoff_unit_ms = 250
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.twilio.auth_token, "tok");
        assert_eq!(config.twilio.api_base, "https://api.twilio.com");
        assert_eq!(
            config.twilio.webhook_url.as_deref(),
            Some("https://hotline.example.org/api/webhook")
        );
        assert_eq!(config.delivery.backoff_unit_ms, 250);
    }
}
