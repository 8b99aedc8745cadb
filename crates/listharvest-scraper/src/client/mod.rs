//! HTTP client for the vendor-listing endpoints.

mod user_agent;

use std::time::Duration;

use listharvest_core::Coordinate;
use reqwest::Client;
use serde_json::Value;

use crate::error::ScraperError;
use crate::profile::{EndpointProfile, PageRequest};
use crate::results::result_count;

pub use user_agent::BROWSER_USER_AGENTS;

/// One successfully fetched and parsed page.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// The full response body, persisted verbatim.
    pub body: Value,
    /// Number of entries in the profile's results list.
    pub result_count: usize,
}

impl PageResult {
    /// An empty results list is the end-of-pagination signal.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.result_count == 0
    }
}

/// HTTP client bound to one [`EndpointProfile`].
///
/// Makes exactly one request per [`VendorListClient::fetch_page`] call and
/// classifies the outcome. Retrying is the caller's concern.
pub struct VendorListClient {
    client: Client,
    profile: EndpointProfile,
    rotate_user_agent: bool,
}

impl VendorListClient {
    /// Creates a client with the given request timeout.
    ///
    /// When `rotate_user_agent` is set, each request carries a user agent
    /// drawn at random from [`BROWSER_USER_AGENTS`] instead of the profile's.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        profile: EndpointProfile,
        timeout_secs: u64,
        rotate_user_agent: bool,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            profile,
            rotate_user_agent,
        })
    }

    #[must_use]
    pub fn profile(&self) -> &EndpointProfile {
        &self.profile
    }

    /// Full URL that [`Self::fetch_page`] would request.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidEndpoint`] if the profile's base URL is invalid.
    pub fn page_url(&self, coordinate: Coordinate, page: u32) -> Result<String, ScraperError> {
        self.profile
            .url_for(&PageRequest { coordinate, page })
            .map(String::from)
    }

    /// Fetches one page of listings for `coordinate`.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Http`]: network, timeout, or TLS failure.
    /// - [`ScraperError::RateLimited`]: HTTP 429.
    /// - [`ScraperError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`ScraperError::Deserialize`]: response body is not valid JSON.
    /// - [`ScraperError::MalformedResults`]: the results path leads to something
    ///   other than a list.
    /// - [`ScraperError::InvalidEndpoint`]: the profile's base URL is invalid.
    pub async fn fetch_page(
        &self,
        coordinate: Coordinate,
        page: u32,
    ) -> Result<PageResult, ScraperError> {
        let url = self.profile.url_for(&PageRequest { coordinate, page })?;

        let user_agent = if self.rotate_user_agent {
            user_agent::random_user_agent()
        } else {
            self.profile.user_agent.as_str()
        };

        let mut request = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, user_agent);
        for (name, value) in &self.profile.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), page, "received response");

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());
            return Err(ScraperError::RateLimited {
                domain: url.host_str().unwrap_or_default().to_owned(),
                retry_after_secs,
            });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let context = format!("page {page} of {coordinate}");
        let text = response.text().await?;
        let body =
            serde_json::from_str::<Value>(&text).map_err(|e| ScraperError::Deserialize {
                context: context.clone(),
                source: e,
            })?;

        let result_count = result_count(&body, &self.profile.results_path).ok_or_else(|| {
            ScraperError::MalformedResults {
                context,
                path: self.profile.results_path_display(),
            }
        })?;

        Ok(PageResult { body, result_count })
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
