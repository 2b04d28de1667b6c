//! Shared HTTP Client - Retrying REST Client for Registry and Dashboard
//!
//! Wraps reqwest with optional basic auth, a concurrency limit, and
//! exponential-backoff retries on 429 / 5xx / transport errors. Both the
//! Eureka and the admin server adapters go through this client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Failure of an HTTP exchange after retries.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The server could not be reached at all.
    #[error("cannot connect to {url}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("failed to build HTTP client")]
    Build(#[source] reqwest::Error),

    #[error("invalid base URL {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("base URL {0} cannot carry a path")]
    NotABase(String),
}

impl HttpError {
    /// Whether the failure means the remote side is unreachable.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL every path is appended to.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum concurrent requests.
    pub max_concurrent: usize,
    /// Maximum retries on transient errors.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub retry_base_delay: Duration,
    /// Basic auth user.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
}

impl HttpClientConfig {
    /// Defaults for `base_url` with the given timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            max_concurrent: 10,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(200),
            username: None,
            password: None,
        }
    }

    /// Builder-style basic auth credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }
}

/// Concurrency-limited, retrying JSON HTTP client.
///
/// Request paths are given as segments and percent-encoded one by one,
/// so ids containing `/`, `?` or `#` stay inside their own segment.
pub struct HttpClient {
    /// Underlying HTTP client.
    http: Client,
    /// Parsed base URL.
    base: Url,
    /// Client configuration.
    config: HttpClientConfig,
    /// Concurrency limiter.
    semaphore: Arc<Semaphore>,
}

impl HttpClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Fails when the base URL does not parse or cannot carry a path,
    /// or when the TLS backend cannot be initialized.
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpError> {
        let base = Url::parse(&config.base_url).map_err(|source| HttpError::InvalidUrl {
            url: config.base_url.clone(),
            source,
        })?;
        if base.cannot_be_a_base() {
            return Err(HttpError::NotABase(config.base_url.clone()));
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(5)
            .build()
            .map_err(HttpError::Build)?;

        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

        Ok(Self {
            http,
            base,
            config,
            semaphore,
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Base URL extended by `segments`, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, HttpError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| HttpError::NotABase(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Execute a GET request expecting JSON.
    pub async fn get(&self, segments: &[&str]) -> Result<Response, HttpError> {
        let url = self.endpoint(segments)?;
        let request = self
            .http
            .get(url.clone())
            .header("Accept", "application/json");
        self.execute_with_retry(request, "GET", url.into()).await
    }

    /// Execute a POST request with a JSON body.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &T,
    ) -> Result<Response, HttpError> {
        let url = self.endpoint(segments)?;
        let request = self
            .http
            .post(url.clone())
            .header("Accept", "application/json")
            .json(body);
        self.execute_with_retry(request, "POST", url.into()).await
    }

    /// Execute a DELETE request.
    pub async fn delete(&self, segments: &[&str]) -> Result<Response, HttpError> {
        let url = self.endpoint(segments)?;
        let request = self.http.delete(url.clone());
        self.execute_with_retry(request, "DELETE", url.into()).await
    }

    /// Execute request with auth, concurrency limiting, and retries.
    async fn execute_with_retry(
        &self,
        request: RequestBuilder,
        method: &'static str,
        url: String,
    ) -> Result<Response, HttpError> {
        // A closed semaphore only means we stop limiting.
        let _permit = self.semaphore.acquire().await.ok();

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, url = %url, "Retrying request");
                sleep(delay).await;
            }

            let Some(mut req) = request.try_clone() else {
                // Streaming bodies cannot be replayed; send once.
                return self.send_once(request, method, url).await;
            };

            if let Some(user) = &self.config.username {
                req = req.basic_auth(user, self.config.password.as_ref());
            }

            match req.send().await {
                Ok(response) => match response.status() {
                    status if status.is_success() => return Ok(response),
                    StatusCode::TOO_MANY_REQUESTS => {
                        warn!(url = %url, "Rate limited, backing off");
                        last_error = Some(status_error(method, &url, response).await);
                    }
                    status if status.is_server_error() => {
                        warn!(url = %url, status = %status, "Server error, retrying");
                        last_error = Some(status_error(method, &url, response).await);
                    }
                    _ => return Err(status_error(method, &url, response).await),
                },
                Err(e) if e.is_connect() => {
                    warn!(url = %url, attempt, "Connection failed");
                    last_error = Some(HttpError::Connect {
                        url: url.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "Request failed");
                    last_error = Some(HttpError::Transport(e));
                }
            }
        }

        match last_error {
            Some(error) => Err(error),
            None => self.send_once(request, method, url).await,
        }
    }

    async fn send_once(
        &self,
        mut request: RequestBuilder,
        method: &'static str,
        url: String,
    ) -> Result<Response, HttpError> {
        if let Some(user) = &self.config.username {
            request = request.basic_auth(user, self.config.password.as_ref());
        }
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                HttpError::Connect { url: url.clone(), source: e }
            } else {
                HttpError::Transport(e)
            }
        })?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(method, &url, response).await)
        }
    }
}

async fn status_error(method: &'static str, url: &str, response: Response) -> HttpError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    HttpError::Status {
        method,
        url: url.to_string(),
        status,
        body,
    }
}

/// In-process axum server for adapter tests.
#[cfg(test)]
pub(crate) mod test_server {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::Router;

    use super::{HttpClient, HttpClientConfig};

    /// Serve `router` on an ephemeral local port, returning its base URL.
    pub(crate) async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// Client without retries pointed at `base_url`.
    pub(crate) fn client(base_url: &str) -> Arc<HttpClient> {
        let mut config = HttpClientConfig::new(base_url, Duration::from_secs(2));
        config.max_retries = 0;
        Arc::new(HttpClient::new(config).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpClient::new(HttpClientConfig::new(
            "http://localhost:8761/eureka/",
            Duration::from_secs(1),
        ))
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8761/eureka");
        assert_eq!(
            client.endpoint(&["apps"]).unwrap().as_str(),
            "http://localhost:8761/eureka/apps"
        );
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let client = HttpClient::new(HttpClientConfig::new(
            "http://localhost:8081",
            Duration::from_secs(1),
        ))
        .unwrap();
        let url = client.endpoint(&["instances", "orders/1#a?b c%"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8081/instances/orders%2F1%23a%3Fb%20c%25"
        );
        assert_eq!(url.path_segments().unwrap().count(), 2);
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = HttpClient::new(HttpClientConfig::new("localhost:8081", Duration::from_secs(1)));
        assert!(result.is_err());
        let result = HttpClient::new(HttpClientConfig::new("not a url", Duration::from_secs(1)));
        assert!(matches!(result, Err(HttpError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connect_error() {
        let mut config = HttpClientConfig::new("http://127.0.0.1:9", Duration::from_secs(1));
        config.max_retries = 0;
        let client = HttpClient::new(config).unwrap();

        let err = client.get(&["apps"]).await.unwrap_err();
        assert!(err.is_connect(), "unexpected error: {err}");
        assert_eq!(err.status(), None);
    }
}
