use reqwest::StatusCode;
use thiserror::Error;

/// Failures inside the notifier. None of these leave `check_overtime_status`.
#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("status request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("status endpoint returned {0}")]
    Status(StatusCode),

    #[error("status response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("notification permission unavailable")]
    PermissionUnavailable,

    #[error("failed to present notification: {0}")]
    Presentation(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid threshold_hour: {0}. Must be between 0 and 23")]
    InvalidHour(u32),

    #[error("Invalid threshold_minute: {0}. Must be between 0 and 59")]
    InvalidMinute(u32),

    #[error("Invalid poll_interval_ms: {0}. Must be positive")]
    InvalidPollInterval(u64),

    #[error("Invalid base_url: {0}")]
    InvalidBaseUrl(String),

    #[error("Notification tag cannot be empty")]
    EmptyTag,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}
