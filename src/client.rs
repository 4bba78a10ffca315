//! USGS Earthquake API client.
//!
//! Provides async HTTP access to USGS summary feeds.
//! Uses reqwest with rustls for TLS.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::errors::FeedError;
use crate::models::FeatureCollection;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("quaketui/", env!("CARGO_PKG_VERSION"));

/// USGS base URL for earthquake feeds.
pub const USGS_BASE_URL: &str = "https://earthquake.usgs.gov";

/// Longest slice of an error body kept in the error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Available feed types for summary feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedType {
    AllHour,
    AllDay,
    AllWeek,
    AllMonth,
    Mag1Hour,
    Mag1Day,
    Mag1Week,
    Mag1Month,
    Mag25Hour,
    #[default]
    Mag25Day,
    Mag25Week,
    Mag25Month,
    Mag45Hour,
    Mag45Day,
    Mag45Week,
    Mag45Month,
    SignificantHour,
    SignificantDay,
    SignificantWeek,
    SignificantMonth,
}

impl FeedType {
    /// Get the URL path segment for this feed type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllHour => "all_hour",
            Self::AllDay => "all_day",
            Self::AllWeek => "all_week",
            Self::AllMonth => "all_month",
            Self::Mag1Hour => "1.0_hour",
            Self::Mag1Day => "1.0_day",
            Self::Mag1Week => "1.0_week",
            Self::Mag1Month => "1.0_month",
            Self::Mag25Hour => "2.5_hour",
            Self::Mag25Day => "2.5_day",
            Self::Mag25Week => "2.5_week",
            Self::Mag25Month => "2.5_month",
            Self::Mag45Hour => "4.5_hour",
            Self::Mag45Day => "4.5_day",
            Self::Mag45Week => "4.5_week",
            Self::Mag45Month => "4.5_month",
            Self::SignificantHour => "significant_hour",
            Self::SignificantDay => "significant_day",
            Self::SignificantWeek => "significant_week",
            Self::SignificantMonth => "significant_month",
        }
    }
}

impl std::str::FromStr for FeedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all_hour" => Ok(Self::AllHour),
            "all_day" => Ok(Self::AllDay),
            "all_week" => Ok(Self::AllWeek),
            "all_month" => Ok(Self::AllMonth),
            "1.0_hour" => Ok(Self::Mag1Hour),
            "1.0_day" => Ok(Self::Mag1Day),
            "1.0_week" => Ok(Self::Mag1Week),
            "1.0_month" => Ok(Self::Mag1Month),
            "2.5_hour" => Ok(Self::Mag25Hour),
            "2.5_day" => Ok(Self::Mag25Day),
            "2.5_week" => Ok(Self::Mag25Week),
            "2.5_month" => Ok(Self::Mag25Month),
            "4.5_hour" => Ok(Self::Mag45Hour),
            "4.5_day" => Ok(Self::Mag45Day),
            "4.5_week" => Ok(Self::Mag45Week),
            "4.5_month" => Ok(Self::Mag45Month),
            "significant_hour" => Ok(Self::SignificantHour),
            "significant_day" => Ok(Self::SignificantDay),
            "significant_week" => Ok(Self::SignificantWeek),
            "significant_month" => Ok(Self::SignificantMonth),
            _ => Err(format!("unknown feed type: {s}")),
        }
    }
}

/// Anything that can produce one feed snapshot on demand.
///
/// The refresh loop only talks to this trait, so tests can drive it with
/// scripted sources instead of a live endpoint.
pub trait FeedSource: Send + Sync {
    /// Fetch and validate one snapshot.
    fn fetch(&self) -> impl Future<Output = Result<FeatureCollection, FeedError>> + Send;
}

/// Client for one USGS summary feed.
pub struct UsgsClient {
    client: Client,
    url: String,
}

impl UsgsClient {
    /// Create a client for `feed_type` on `base_url`, normally
    /// [`USGS_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_base_url(base_url: &str, feed_type: FeedType) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        let url = format!(
            "{}/earthquakes/feed/v1.0/summary/{}.geojson",
            base_url.trim_end_matches('/'),
            feed_type.as_str()
        );

        Ok(Self { client, url })
    }

    /// The endpoint this client polls.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the summary GeoJSON feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the document is malformed.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_feed(&self) -> Result<FeatureCollection, FeedError> {
        debug!("fetching feed");

        let response = self.client.get(&self.url).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match body.trim() {
                "" => status.canonical_reason().unwrap_or("no response body").to_string(),
                text => text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            };
            return Err(FeedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let feed: FeatureCollection = serde_json::from_slice(&body)?;

        // Validate response structure
        feed.validate()?;

        debug!("fetched {} events", feed.features.len());
        Ok(feed)
    }
}

impl FeedSource for UsgsClient {
    async fn fetch(&self) -> Result<FeatureCollection, FeedError> {
        self.fetch_feed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED_PATH: &str = "/earthquakes/feed/v1.0/summary/2.5_day.geojson";

    #[test]
    fn test_feed_type_round_trip() {
        let types = [
            FeedType::AllHour,
            FeedType::Mag25Day,
            FeedType::SignificantWeek,
        ];

        for feed_type in types {
            let s = feed_type.as_str();
            let parsed: FeedType = s.parse().expect("failed to parse");
            assert_eq!(parsed, feed_type);
        }
    }

    #[test]
    fn test_default_feed_url() {
        let client = UsgsClient::with_base_url(USGS_BASE_URL, FeedType::default()).expect("client");
        assert_eq!(
            client.url(),
            "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/2.5_day.geojson"
        );

        let slashed = UsgsClient::with_base_url("http://localhost:8080/", FeedType::AllHour).expect("client");
        assert_eq!(slashed.url(), "http://localhost:8080/earthquakes/feed/v1.0/summary/all_hour.geojson");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", FEED_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(include_str!("../tools/sample_2.5_day.json"))
            .create_async()
            .await;

        let client = UsgsClient::with_base_url(&server.url(), FeedType::Mag25Day).expect("client");
        let feed = client.fetch().await.expect("fetch should succeed");

        assert_eq!(feed.features.len(), 6);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", FEED_PATH)
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = UsgsClient::with_base_url(&server.url(), FeedType::Mag25Day).expect("client");
        let err = client.fetch().await.expect_err("503 must fail");

        match err {
            FeedError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", FEED_PATH)
            .with_status(200)
            .with_body("{\"type\": \"FeatureCollection\", \"features\": [")
            .create_async()
            .await;

        let client = UsgsClient::with_base_url(&server.url(), FeedType::Mag25Day).expect("client");
        let err = client.fetch().await.expect_err("truncated JSON must fail");

        assert!(matches!(err, FeedError::Parse(_)));
        assert!(err.to_string().starts_with("Failed to parse JSON"));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Nothing listens on port 9 on a test host.
        let client = UsgsClient::with_base_url("http://127.0.0.1:9", FeedType::Mag25Day).expect("client");
        let err = client.fetch().await.expect_err("no server");

        assert!(matches!(err, FeedError::Http(_)));
    }
}
