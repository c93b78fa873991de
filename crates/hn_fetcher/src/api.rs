use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

use hn_core::{Error, Item, Result, StoryCategory, UserProfile};

pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: usize = 3;

/// Client for the HackerNews Firebase API. The base URL is swappable so
/// tests can point it at a local mock server.
#[derive(Debug, Clone)]
pub struct HnClient {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl HnClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        while url.ends_with('/') {
            url.pop();
        }
        self.base_url = url;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Ids listed by a category endpoint, truncated to `limit`.
    pub async fn story_ids(&self, category: StoryCategory, limit: usize) -> Result<Vec<u64>> {
        let url = format!("{}/{}.json", self.base_url, category.as_str());
        let mut ids: Vec<u64> = self.fetch_json(&url).await?;
        ids.truncate(limit);
        Ok(ids)
    }

    /// A single item. The API answers `null` for unknown or purged ids,
    /// which maps to `Ok(None)`.
    pub async fn item(&self, id: u64) -> Result<Option<Item>> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        self.fetch_json(&url).await
    }

    /// A user profile, or `None` for unknown usernames.
    pub async fn user(&self, username: &str) -> Result<Option<UserProfile>> {
        let url = format!("{}/user/{}.json", self.base_url, username);
        self.fetch_json(&url).await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response.json::<T>().await?);
                    }
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("🔁 {} answered {}, retry {}/{}", url, status, attempt, self.max_retries);
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(Error::Fetch(format!(
                        "request to {} failed with status {}",
                        url, status
                    )));
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("🔁 {} failed ({}), retry {}/{}", url, err, attempt, self.max_retries);
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() || err.is_decode()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(250 * (1 << capped))
}
