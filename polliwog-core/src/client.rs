//! HTTP client for the remote event feed
//!
//! The feed is a session-authenticated API: a cookie from `login` plus an
//! `admit` handshake gate every later call. The client keeps a cookie store
//! and performs every request sequentially; there is no request concurrency
//! anywhere in the pipeline.
//!
//! Failure classes differ by endpoint and the error variants encode that:
//! login/admit/overview/listing failures are [`Error::Session`] (fatal to the
//! run), while a failed attachment download surfaces as a plain transport
//! error that the driver logs and skips.

use std::time::Duration;

use crate::config::FeedConfig;
use crate::error::{Error, Result};
use crate::paginate::PAGE_SIZE;
use crate::types::{Attachment, EventsPage, Overview};

/// Static client descriptor the `admit` endpoint expects alongside the
/// session cookie.
const ADMIT_FORM: &[(&str, &str)] = &[
    ("state", "client"),
    ("os_name", "iphone"),
    ("app_version", "8.8.7"),
    ("ostype", "64bit"),
    ("tz", "America New_York"),
    ("battery_level", "-1"),
    ("locale", "en-US"),
    ("available_memory", "62.65625"),
    ("platform_version", "11.4.1"),
    ("logged_in", "0"),
    ("uses_dst", "1"),
    ("utc_offset", "-05:00"),
    ("model", "iPhone9,1"),
    ("v", "2"),
];

/// Read-side interface over the feed.
///
/// [`FeedClient`] is the production implementation; tests drive the pipeline
/// through an in-memory feed instead.
#[allow(async_fn_in_trait)]
pub trait EventFeed {
    /// Earliest/latest known event times for the account.
    async fn overview(&self) -> Result<Overview>;

    /// One page of events covering `(earliest, latest]`, newest first.
    async fn events_page(&self, earliest: i64, latest: i64) -> Result<EventsPage>;

    /// Raw bytes plus declared content type for one attachment key.
    async fn attachment(&self, key: &str) -> Result<Attachment>;
}

/// Cookie-session HTTP client for the feed API.
pub struct FeedClient {
    http: reqwest::Client,
    base_url: String,
}

impl FeedClient {
    /// Create a client from configuration.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("feed.base_url is required".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    /// Authenticate the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        tracing::info!(username, "Authenticating");

        let url = format!("{}/auth/login", self.base_url);
        let form = [
            ("email", username),
            ("password", password),
            ("server", "tadpoles"),
        ];

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Session(format!("login request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Session(format!("login rejected ({})", status)));
        }
        Ok(())
    }

    /// Admit the authenticated session. Required once after [`login`](Self::login)
    /// before any feed call succeeds.
    pub async fn admit(&self) -> Result<()> {
        tracing::info!("Admitting session");

        let url = format!("{}/remote/v1/athome/admit", self.base_url);

        let response = self
            .http
            .post(&url)
            .form(ADMIT_FORM)
            .send()
            .await
            .map_err(|e| Error::Session(format!("admit request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Session(format!("admit rejected ({})", status)));
        }
        Ok(())
    }
}

impl EventFeed for FeedClient {
    async fn overview(&self) -> Result<Overview> {
        tracing::info!("Fetching account overview");

        let url = format!("{}/remote/v1/parameters", self.base_url);
        let query = [("include_all_kids", "true"), ("include_guardians", "false")];

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Session(format!("overview request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Session(format!("overview rejected ({})", status)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Session(format!("failed to parse overview: {}", e)))
    }

    async fn events_page(&self, earliest: i64, latest: i64) -> Result<EventsPage> {
        tracing::info!(latest, earliest, "Fetching event listings");

        let url = format!("{}/remote/v1/events", self.base_url);
        let num_events = PAGE_SIZE.to_string();
        let latest_s = latest.to_string();
        let earliest_s = earliest.to_string();
        let query = [
            ("state", "client"),
            ("num_events", num_events.as_str()),
            ("direction", "range"),
            ("latest_event_time", latest_s.as_str()),
            ("earliest_event_time", earliest_s.as_str()),
        ];

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::Session(format!("events request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Session(format!("events rejected ({})", status)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Session(format!("failed to parse events page: {}", e)))
    }

    async fn attachment(&self, key: &str) -> Result<Attachment> {
        let url = format!("{}/remote/v1/attachment", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&[("key", key)])
            .header(reqwest::header::ACCEPT, "*/*")
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = response.bytes().await?.to_vec();

        Ok(Attachment {
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;

    #[test]
    fn test_client_trims_trailing_slash() {
        let config = FeedConfig {
            base_url: "https://feed.example.com/".to_string(),
            ..Default::default()
        };
        let client = FeedClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://feed.example.com");
    }

    #[test]
    fn test_client_rejects_empty_base_url() {
        let config = FeedConfig {
            base_url: String::new(),
            ..Default::default()
        };
        assert!(FeedClient::new(&config).is_err());
    }
}
