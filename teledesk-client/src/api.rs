//! HTTP access to the registry backend.
//!
//! [`DirectoryApi`] is the seam between the store and the wire: the store
//! only ever talks to the trait, so tests inject a scripted implementation
//! (see [`crate::testing`]) and production code uses [`ApiClient`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use teledesk_model::{Address, NewAddress, NewUser, User};

use crate::error::{DirectoryError, DirectoryResult};

/// Response header carrying the backend's total record count, when the
/// backend chooses to send one.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One page of users plus the optional total record count.
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    pub records: Vec<User>,
    pub total_count: Option<usize>,
}

/// Backend operations the store depends on.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Fetch one page of users sorted by creation time, newest first.
    async fn fetch_users(&self, offset: usize, limit: usize) -> DirectoryResult<UserPage>;

    /// Create a user. The backend assigns the id and returns the full record.
    async fn add_user(&self, new_user: NewUser) -> DirectoryResult<User>;

    /// Fetch every non-deleted address.
    async fn fetch_addresses(&self) -> DirectoryResult<Vec<Address>>;

    /// Create an address. The backend assigns the id and returns the full
    /// record.
    async fn add_address(&self, new_address: NewAddress) -> DirectoryResult<Address>;
}

/// HTTP implementation of [`DirectoryApi`].
///
/// Stateless beyond the connection pool: no retries, no local caching, every
/// failure is surfaced to the caller.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiClient {
    /// Create a client with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> DirectoryResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> DirectoryResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        log::info!("[ApiClient] created for base URL: {base_url}");

        Ok(Self { client, base_url })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Execute a request and translate non-2xx answers, capturing the error
    /// body text for the caller.
    async fn send(&self, request: RequestBuilder) -> DirectoryResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(DirectoryError::Server { status, message })
    }
}

#[async_trait]
impl DirectoryApi for ApiClient {
    async fn fetch_users(&self, offset: usize, limit: usize) -> DirectoryResult<UserPage> {
        let url = self.build_url("users");
        log::debug!("GET request to: {url} (_start={offset}, _limit={limit})");

        let request = self
            .client
            .get(&url)
            .query(&[("_sort", "created_at"), ("_order", "desc")])
            .query(&[("_start", offset), ("_limit", limit)]);
        let response = self.send(request).await?;

        let total_count = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        let records = response.json::<Vec<User>>().await?;

        Ok(UserPage {
            records,
            total_count,
        })
    }

    async fn add_user(&self, new_user: NewUser) -> DirectoryResult<User> {
        let url = self.build_url("users");
        log::debug!("POST request to: {url}");

        let payload = new_user.with_defaults();
        let response = self.send(self.client.post(&url).json(&payload)).await?;
        Ok(response.json().await?)
    }

    async fn fetch_addresses(&self) -> DirectoryResult<Vec<Address>> {
        let url = self.build_url("addresses");
        log::debug!("GET request to: {url}");

        let request = self.client.get(&url).query(&[("is_deleted", "false")]);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    async fn add_address(&self, new_address: NewAddress) -> DirectoryResult<Address> {
        let url = self.build_url("addresses");
        log::debug!("POST request to: {url}");

        let payload = new_address.with_defaults();
        let response = self.send(self.client.post(&url).json(&payload)).await?;
        Ok(response.json().await?)
    }
}
