//! HTTP fetching for the scraper.
//!
//! One pooled reqwest client is shared by every request a [`Scraper`](super::Scraper)
//! makes. No retries and no rate limiting.

use std::time::Duration;

use crate::{Error, Result};

const USER_AGENT: &str = concat!("docgraph/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(TIMEOUT)
        .pool_max_idle_per_host(10)
        .build()
        .map_err(|e| Error::Scrape(format!("failed to build HTTP client: {e}")))
}

/// Fetches a page body, rejecting non-http(s) urls and non-success statuses.
pub(crate) async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<String> {
    let parsed =
        url::Url::parse(url).map_err(|e| Error::Scrape(format!("invalid url {url}: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::Scrape(format!(
            "unsupported scheme for {url}: {} (only http/https allowed)",
            parsed.scheme()
        )));
    }

    let response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| Error::Scrape(format!("failed to fetch {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Scrape(format!("{url} returned {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| Error::Scrape(format!("failed to read body of {url}: {e}")))
}
