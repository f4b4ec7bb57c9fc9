use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{OvertimeNotification, Permission, ThresholdConfig};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub schedule: ScheduleConfig,
    pub notification: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub status_path: String,
    pub checkout_path: String,
    /// Sent verbatim as the `Cookie` header, e.g. `sessionid=...`.
    pub session_cookie: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            status_path: "/absensi/api/check-overtime-status/".to_string(),
            checkout_path: "/absensi/pulang/".to_string(),
            session_cookie: None,
            timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Join a server-relative path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub threshold_hour: u32,
    pub threshold_minute: u32,
    pub poll_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        let threshold = ThresholdConfig::default();
        Self {
            threshold_hour: threshold.hour,
            threshold_minute: threshold.minute,
            poll_interval_ms: 60_000,
        }
    }
}

impl ScheduleConfig {
    pub fn threshold(&self) -> ThresholdConfig {
        ThresholdConfig::new(self.threshold_hour, self.threshold_minute)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub title: String,
    pub body: String,
    /// Server-relative path or absolute URL.
    pub icon: String,
    pub tag: String,
    pub require_interaction: bool,
    /// Pin the permission instead of probing the desktop (`denied` opts out).
    pub permission: Permission,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: "⏰ Reminder Jam Pulang".to_string(),
            body: "Sudah lewat jam 18:30! Anda dapat mengajukan klaim lembur untuk hari ini. \
                   Jangan lupa check-out."
                .to_string(),
            icon: "/static/img/brand/favicon.png".to_string(),
            tag: "overtime-alert".to_string(),
            require_interaction: true,
            permission: Permission::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. ~/.lembur/config.yaml
    /// 3. ./.lembur.yaml
    /// 4. LEMBUR_* environment variables (`__` separates nested keys)
    pub fn load() -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(home) = home_config_path() {
            figment = figment.merge(Yaml::file(home));
        }
        let config: Config = figment
            .merge(Yaml::file(".lembur.yaml"))
            .merge(Env::prefixed("LEMBUR_").split("__"))
            .extract()
            .context("Failed to extract configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring LEMBUR_* overrides.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("LEMBUR_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.threshold_hour > 23 {
            return Err(ConfigError::InvalidHour(self.schedule.threshold_hour));
        }
        if self.schedule.threshold_minute > 59 {
            return Err(ConfigError::InvalidMinute(self.schedule.threshold_minute));
        }
        if self.schedule.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(0));
        }

        if self.server.base_url.is_empty() || Url::parse(&self.server.base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl(self.server.base_url.clone()));
        }

        if self.notification.tag.is_empty() {
            return Err(ConfigError::EmptyTag);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    /// Build the notification the notifier presents, with URLs resolved against the server.
    pub fn overtime_notification(&self) -> OvertimeNotification {
        let n = &self.notification;
        let icon = if n.icon.starts_with("http://") || n.icon.starts_with("https://") {
            n.icon.clone()
        } else {
            self.server.url_for(&n.icon)
        };
        OvertimeNotification {
            title: n.title.clone(),
            body: n.body.clone(),
            icon,
            tag: n.tag.clone(),
            require_interaction: n.require_interaction,
            click_url: self.server.url_for(&self.server.checkout_path),
        }
    }
}

fn home_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".lembur").join("config.yaml"))
}
