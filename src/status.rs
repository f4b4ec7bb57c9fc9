use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, COOKIE};
use tracing::debug;

use crate::config::ServerConfig;
use crate::error::NotifierError;
use crate::models::StatusSnapshot;

/// Remote source of the user's overtime and attendance flags.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<StatusSnapshot, NotifierError>;
}

/// `GET <base_url><status_path>` returning `{should_notify, has_checked_in, has_checked_out}`.
pub struct HttpStatusSource {
    client: Client,
    url: String,
    session_cookie: Option<String>,
}

impl HttpStatusSource {
    pub fn new(config: &ServerConfig) -> Result<Self, NotifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url_for(&config.status_path),
            session_cookie: config.session_cookie.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self) -> Result<StatusSnapshot, NotifierError> {
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json");
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::Status(status));
        }

        // Decode by hand so a non-JSON body (e.g. a login page) is a Decode error.
        let body = response.bytes().await?;
        let snapshot: StatusSnapshot = serde_json::from_slice(&body)?;
        debug!(?snapshot, "Fetched overtime status");
        Ok(snapshot)
    }
}
