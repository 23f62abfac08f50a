//! Shopify Admin API client with rate limiting and bounded retry.
//!
//! Both call paths - [`ShopifyClient::graphql`] and [`ShopifyClient::rest`] -
//! share one [`ApiGate`] and one retry policy, since REST and GraphQL consume
//! the same per-shop rate budget. No call site talks to the platform outside
//! these two methods.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::instrument;

use crate::config::ShopifyConfig;

use super::gate::ApiGate;
use super::{GraphQLError, ShopifyError};

/// Total attempts per call (1 initial + 2 retries).
const MAX_ATTEMPTS: u32 = 3;

/// Backoff when a 429 carries no `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 2;

/// Fixed backoff for GraphQL-level throttling.
const THROTTLE_BACKOFF: Duration = Duration::from_secs(2);

/// HTTP method for REST calls. A closed set - call sites cannot smuggle in
/// arbitrary method strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RestMethod {
    const fn as_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Shopify Admin API client.
///
/// Cheap to clone; all clones share the HTTP connection pool and the
/// admission gate.
#[derive(Clone)]
pub struct ShopifyClient {
    inner: Arc<ShopifyClientInner>,
}

struct ShopifyClientInner {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    access_token: SecretString,
    gate: ApiGate,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    extensions: GraphQLErrorExtensions,
}

#[derive(Debug, Default, Deserialize)]
struct GraphQLErrorExtensions {
    code: Option<String>,
}

enum Outcome<T> {
    Done(T),
    /// A retryable rate-limit signal: `RateLimited` or `Throttled`.
    Retry(ShopifyError),
}

/// Backoff for a rate-limit signal. `RateLimited` carries the server's
/// `Retry-After`; GraphQL throttling gets the fixed delay.
fn backoff_for(signal: &ShopifyError) -> Duration {
    match signal {
        ShopifyError::RateLimited(secs) => Duration::from_secs(*secs),
        _ => THROTTLE_BACKOFF,
    }
}

impl ShopifyClient {
    /// Create a new Admin API client with the default 500 ms gate.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        Self::with_base_url(
            format!("https://{}", config.store),
            config.api_version.clone(),
            config.access_token.clone(),
            ApiGate::default(),
        )
    }

    /// Create a client against an explicit base URL with an explicit gate.
    ///
    /// Used by tests to point the client at a local mock server with a
    /// zero-delay gate.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn with_base_url(
        base_url: String,
        api_version: String,
        access_token: SecretString,
        gate: ApiGate,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(ShopifyClientInner {
                http,
                base_url,
                api_version,
                access_token,
                gate,
            }),
        }
    }

    fn graphql_endpoint(&self) -> String {
        format!(
            "{}/admin/api/{}/graphql.json",
            self.inner.base_url, self.inner.api_version
        )
    }

    fn rest_url(&self, path: &str) -> String {
        format!(
            "{}/admin/api/{}/{}",
            self.inner.base_url,
            self.inner.api_version,
            path.trim_start_matches('/')
        )
    }

    fn token_header(&self) -> Result<HeaderValue, ShopifyError> {
        HeaderValue::from_str(self.inner.access_token.expose_secret())
            .map_err(|e| ShopifyError::Parse(format!("Invalid access token header: {e}")))
    }

    /// Execute a GraphQL operation with retry on rate-limit signals.
    ///
    /// `operation` names the call in logs and in `MaxRetries` errors.
    ///
    /// # Errors
    ///
    /// - `RateLimited`/`Throttled` signals are retried up to 3 total attempts,
    ///   then surfaced as `MaxRetries`
    /// - Any other GraphQL error, a missing `data` envelope, or a non-success
    ///   HTTP status fails immediately
    #[instrument(skip(self, query, variables), fields(operation = %operation))]
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ShopifyError> {
        let endpoint = self.graphql_endpoint();
        let token = self.token_header()?;
        let body = serde_json::json!({ "query": query, "variables": variables });

        let mut last_signal = ShopifyError::Throttled;
        for attempt in 1..=MAX_ATTEMPTS {
            let response = {
                let permit = self.inner.gate.admit().await;
                let result = self
                    .inner
                    .http
                    .post(&endpoint)
                    .header("X-Shopify-Access-Token", token.clone())
                    .header("Content-Type", "application/json")
                    .json(&body)
                    .send()
                    .await;
                drop(permit);
                result?
            };

            match Self::classify_graphql::<T>(response).await? {
                Outcome::Done(data) => return Ok(data),
                Outcome::Retry(signal) => {
                    if attempt == MAX_ATTEMPTS {
                        last_signal = signal;
                        break;
                    }
                    let delay = backoff_for(&signal);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    last_signal = signal;
                }
            }
        }

        Err(ShopifyError::MaxRetries {
            operation: operation.to_string(),
            source: Box::new(last_signal),
        })
    }

    /// Classify one GraphQL response into a result or a retryable signal.
    async fn classify_graphql<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Outcome<T>, ShopifyError> {
        if let Some(secs) = retry_after_429(&response) {
            return Ok(Outcome::Retry(ShopifyError::RateLimited(secs)));
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShopifyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let graphql_response: GraphQLResponse<T> = response.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    code: e.extensions.code,
                })
                .collect();

            // Throttling is the only GraphQL error worth retrying; the
            // platform rejected anything else on its merits.
            if converted.iter().any(GraphQLError::is_throttled) {
                return Ok(Outcome::Retry(ShopifyError::Throttled));
            }
            return Err(ShopifyError::GraphQL(converted));
        }

        graphql_response
            .data
            .map(Outcome::Done)
            .ok_or_else(|| ShopifyError::Parse("No data in response".to_string()))
    }

    /// Execute a REST call with retry on rate-limit signals.
    ///
    /// # Errors
    ///
    /// 429 responses are retried up to 3 total attempts, then surfaced as
    /// `MaxRetries`; any other non-success status fails immediately with the
    /// status and body.
    #[instrument(skip(self, body), fields(method = ?method, path = %path))]
    pub async fn rest(
        &self,
        method: RestMethod,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<serde_json::Value, ShopifyError> {
        let url = self.rest_url(path);
        let token = self.token_header()?;

        let mut last_signal = ShopifyError::Throttled;
        for attempt in 1..=MAX_ATTEMPTS {
            let response = {
                let permit = self.inner.gate.admit().await;
                let mut request = self
                    .inner
                    .http
                    .request(method.as_reqwest(), &url)
                    .header("X-Shopify-Access-Token", token.clone());
                if let Some(body) = body {
                    request = request.json(body);
                }
                let result = request.send().await;
                drop(permit);
                result?
            };

            if let Some(secs) = retry_after_429(&response) {
                last_signal = ShopifyError::RateLimited(secs);
                if attempt == MAX_ATTEMPTS {
                    break;
                }
                tracing::warn!(
                    path,
                    attempt,
                    delay_secs = secs,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(Duration::from_secs(secs)).await;
                continue;
            }

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ShopifyError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let text = response.text().await?;
            if text.is_empty() {
                return Ok(serde_json::Value::Null);
            }
            return Ok(serde_json::from_str(&text)?);
        }

        Err(ShopifyError::MaxRetries {
            operation: path.to_string(),
            source: Box::new(last_signal),
        })
    }
}

/// Extract the retry delay in seconds from a 429 response, defaulting to 2.
fn retry_after_429(response: &reqwest::Response) -> Option<u64> {
    if response.status() != reqwest::StatusCode::TOO_MANY_REQUESTS {
        return None;
    }
    let secs = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
    Some(secs)
}

impl std::fmt::Debug for ShopifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyClient")
            .field("base_url", &self.inner.base_url)
            .field("api_version", &self.inner.api_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_method_mapping() {
        assert_eq!(RestMethod::Get.as_reqwest(), reqwest::Method::GET);
        assert_eq!(RestMethod::Post.as_reqwest(), reqwest::Method::POST);
        assert_eq!(RestMethod::Put.as_reqwest(), reqwest::Method::PUT);
        assert_eq!(RestMethod::Delete.as_reqwest(), reqwest::Method::DELETE);
    }

    #[test]
    fn test_url_construction() {
        let client = ShopifyClient::with_base_url(
            "https://test.myshopify.com".to_string(),
            "2026-01".to_string(),
            SecretString::from("shpat_test"),
            ApiGate::new(Duration::ZERO),
        );

        assert_eq!(
            client.graphql_endpoint(),
            "https://test.myshopify.com/admin/api/2026-01/graphql.json"
        );
        assert_eq!(
            client.rest_url("/products/42/metafields.json"),
            "https://test.myshopify.com/admin/api/2026-01/products/42/metafields.json"
        );
    }
}
