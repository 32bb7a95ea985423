//! Content API client.
//!
//! Every request is a GET against `<base_url><endpoint>` carrying the
//! `api-key` header. Responses are JSON envelopes of the form
//! `{ "data": ... }`; only the `data` member is handed back. Successful
//! responses pass through an optional [`ResponseCache`].

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, trace};
use url::Url;

use imchef_shared::{ChefError, Result, RunConfig};
use imchef_storage::ResponseCache;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "api-key";

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("imchef/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ApiSource
// ---------------------------------------------------------------------------

/// Something that can resolve an endpoint path to the `data` of its envelope.
///
/// The walker only ever talks to this trait, so tests can swap the HTTP
/// client for an in-memory fixture.
pub trait ApiSource {
    fn fetch_data(&self, endpoint: &str) -> impl Future<Output = Result<Value>>;
}

/// Request counters for one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub network: usize,
    pub cache_hits: usize,
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// HTTP implementation of [`ApiSource`].
pub struct ApiClient {
    base_url: String,
    api_key: String,
    client: Client,
    cache: Option<(ResponseCache, Duration)>,
    network: AtomicUsize,
    cache_hits: AtomicUsize,
}

impl ApiClient {
    /// Create a client without a response cache.
    pub fn new(base_url: &Url, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| ChefError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            cache: None,
            network: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
        })
    }

    /// Create a client from the run configuration. The cache is attached separately.
    pub fn from_config(config: &RunConfig) -> Result<Self> {
        Self::new(&config.base_url, config.api_key.clone(), config.timeout)
    }

    /// Serve responses younger than `expire_after` from `cache`.
    pub fn with_cache(mut self, cache: ResponseCache, expire_after: Duration) -> Self {
        self.cache = Some((cache, expire_after));
        self
    }

    /// Absolute URL for an endpoint path such as `/grade_bands/3`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            network: self.network.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Fetch the raw body for `url`, consulting the cache first.
    async fn fetch_body(&self, url: &str) -> Result<String> {
        if let Some((cache, expire_after)) = &self.cache {
            if let Some(hit) = cache.get_fresh(url, *expire_after).await? {
                trace!(%url, fetched_at = %hit.fetched_at, "cache hit");
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(hit.body);
            }
        }

        self.network.fetch_add(1, Ordering::Relaxed);
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| ChefError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChefError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ChefError::Network(format!("{url}: body read failed: {e}")))?;

        if let Some((cache, _)) = &self.cache {
            cache.put(url, status.as_u16(), &body).await?;
        }

        Ok(body)
    }
}

impl ApiSource for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_data(&self, endpoint: &str) -> Result<Value> {
        debug!("fetching data");
        let url = self.endpoint_url(endpoint);
        let body = self.fetch_body(&url).await?;
        unwrap_envelope(&url, &body)
    }
}

/// Parse `{ "data": ... }` and return the `data` member.
fn unwrap_envelope(url: &str, body: &str) -> Result<Value> {
    let envelope: Value = serde_json::from_str(body)
        .map_err(|e| ChefError::parse(format!("{url}: invalid JSON: {e}")))?;

    match envelope {
        Value::Object(mut map) => map
            .remove("data")
            .ok_or_else(|| ChefError::parse(format!("{url}: response has no 'data' field"))),
        _ => Err(ChefError::parse(format!(
            "{url}: response is not a JSON object"
        ))),
    }
}
