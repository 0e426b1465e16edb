//! # Runtime Configuration
//!
//! Loaded once at startup from the environment.
//!
//! ## Security Requirements
//!
//! - `LINE_CHANNEL_SECRET` and `LINE_CHANNEL_ACCESS_TOKEN` MUST be set
//! - A Drive token without a folder id is rejected rather than uploading to
//!   the account root

use rx_intake::{ConversationPolicy, IntakeConfig, MessageCatalog, PreConsentImagePolicy};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("GOOGLE_DRIVE_ACCESS_TOKEN is set but GOOGLE_DRIVE_FOLDER_ID is not")]
    DriveFolderMissing,
}

/// Google Drive upload settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveConfig {
    pub access_token: String,
    pub folder_id: String,
}

/// Printer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    pub name: String,
    /// Spooler command, invoked as `<command> -d <name> <file>`.
    pub command: String,
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub channel_secret: String,
    pub channel_access_token: String,
    pub host: String,
    pub port: u16,
    pub store_name: String,
    pub privacy_policy_url: String,
    pub guide_image_url: Option<String>,
    pub pre_consent_images: PreConsentImagePolicy,
    pub artifact_dir: PathBuf,
    pub session_idle_timeout: Duration,
    pub drive_access_token: Option<String>,
    pub drive_folder_id: Option<String>,
    pub printer: Option<PrinterConfig>,
    /// Timeout for every outbound HTTP call.
    pub http_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let catalog = MessageCatalog::default();
        Self {
            channel_secret: String::new(),
            channel_access_token: String::new(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            store_name: catalog.store_name,
            privacy_policy_url: catalog.privacy_policy_url,
            guide_image_url: catalog.guide_image_url,
            pre_consent_images: PreConsentImagePolicy::default(),
            artifact_dir: PathBuf::from("/tmp/rx-intake"),
            session_idle_timeout: Duration::from_secs(24 * 60 * 60),
            drive_access_token: None,
            drive_folder_id: None,
            printer: None,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl RuntimeConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.channel_secret = get("LINE_CHANNEL_SECRET").unwrap_or_default();
        config.channel_access_token = get("LINE_CHANNEL_ACCESS_TOKEN").unwrap_or_default();

        if let Some(host) = get("RX_HTTP_HOST") {
            config.host = host;
        }
        if let Some(port) = get("RX_HTTP_PORT") {
            config.port = parse("RX_HTTP_PORT", &port)?;
        } else if let Some(port) = get("PORT") {
            config.port = parse("PORT", &port)?;
        }

        if let Some(name) = get("RX_STORE_NAME") {
            config.store_name = name;
        }
        if let Some(url) = get("RX_PRIVACY_POLICY_URL") {
            config.privacy_policy_url = url;
        }
        if let Some(url) = get("RX_GUIDE_IMAGE_URL") {
            config.guide_image_url = Some(url);
        }
        if let Some(policy) = get("RX_PRE_CONSENT_IMAGES") {
            config.pre_consent_images = policy.parse().map_err(|e: String| ConfigError::Invalid {
                key: "RX_PRE_CONSENT_IMAGES",
                value: policy.clone(),
                reason: e,
            })?;
        }

        if let Some(dir) = get("RX_ARTIFACT_DIR") {
            config.artifact_dir = PathBuf::from(dir);
        }
        if let Some(secs) = get("RX_SESSION_IDLE_SECS") {
            config.session_idle_timeout =
                Duration::from_secs(parse("RX_SESSION_IDLE_SECS", &secs)?);
        }

        config.drive_access_token = get("GOOGLE_DRIVE_ACCESS_TOKEN");
        config.drive_folder_id = get("GOOGLE_DRIVE_FOLDER_ID");
        config.printer = get("RX_PRINTER_NAME").map(|name| PrinterConfig {
            name,
            command: get("RX_PRINT_COMMAND").unwrap_or_else(|| "lp".to_string()),
        });

        if let Some(secs) = get("RX_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(parse("RX_HTTP_TIMEOUT_SECS", &secs)?);
        }

        Ok(config)
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_secret.is_empty() {
            return Err(ConfigError::Missing("LINE_CHANNEL_SECRET"));
        }
        if self.channel_access_token.is_empty() {
            return Err(ConfigError::Missing("LINE_CHANNEL_ACCESS_TOKEN"));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                key: "RX_HTTP_PORT",
                value: "0".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.drive_access_token.is_some() && self.drive_folder_id.is_none() {
            return Err(ConfigError::DriveFolderMissing);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            key: "RX_HTTP_HOST",
            value: addr.clone(),
            reason: e.to_string(),
        })
    }

    /// Drive settings when the upload step is enabled.
    pub fn drive(&self) -> Option<DriveConfig> {
        match (&self.drive_access_token, &self.drive_folder_id) {
            (Some(token), Some(folder)) => Some(DriveConfig {
                access_token: token.clone(),
                folder_id: folder.clone(),
            }),
            _ => None,
        }
    }

    pub fn intake_config(&self) -> IntakeConfig {
        IntakeConfig {
            policy: ConversationPolicy::new(self.pre_consent_images),
            catalog: MessageCatalog {
                store_name: self.store_name.clone(),
                privacy_policy_url: self.privacy_policy_url.clone(),
                guide_image_url: self.guide_image_url.clone(),
            },
            session_idle_timeout: self.session_idle_timeout,
        }
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}
