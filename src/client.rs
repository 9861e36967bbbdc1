//! codeBeamer REST client.
//!
//! Low-level HTTP client that handles authentication and raw requests.
//! Entities hold a clone of it and use it to hydrate themselves; it never
//! carries per-entity state.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::Serialize;
use url::Url;

use crate::error::{CbError, Result};

const DEFAULT_API_ROOT: &str = "cb/api/v3";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const USER_AGENT: &str = concat!("cbapi/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// Low-level codeBeamer API client.
///
/// Handles basic authentication and HTTP requests against the versioned
/// API root. Entity-specific operations live on the model types.
///
/// This struct is cheaply cloneable; clones reference the same underlying
/// connection pool and credentials.
///
/// # Example
///
/// ```no_run
/// use cbapi::RestClient;
///
/// # fn example() -> cbapi::Result<()> {
/// // Create from environment variables
/// let client = RestClient::from_env()?;
///
/// // Or configure manually
/// let client = RestClient::new("https://codebeamer.example.com", "bond", "007")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    base_url: Arc<Url>,
    credentials: Arc<Credentials>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RestClient`] when the defaults do not fit.
#[derive(Debug, Clone)]
pub struct RestClientBuilder {
    url: String,
    username: String,
    password: String,
    api_root: String,
    timeout: Duration,
}

impl RestClientBuilder {
    /// Override the API root appended to the server URL (default `cb/api/v3`).
    #[must_use]
    pub fn api_root(mut self, api_root: &str) -> Self {
        self.api_root = api_root.trim_matches('/').to_string();
        self
    }

    /// Override the per-request timeout (default 60 seconds).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn build(self) -> Result<RestClient> {
        let root = self.url.trim_end_matches('/');
        let base_url_str = if self.api_root.is_empty() {
            format!("{root}/")
        } else {
            format!("{root}/{}/", self.api_root)
        };

        let base_url = Url::parse(&base_url_str)?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .timeout(self.timeout)
            .build()
            .map_err(CbError::HttpError)?;

        Ok(RestClient {
            http,
            base_url: Arc::new(base_url),
            credentials: Arc::new(Credentials {
                username: self.username,
                password: self.password,
            }),
        })
    }
}

impl RestClient {
    /// Create a client from environment variables.
    ///
    /// Uses `CODEBEAMER_URL`, `CODEBEAMER_USERNAME` and `CODEBEAMER_PASSWORD`,
    /// and optionally `CODEBEAMER_TIMEOUT_SECS` for the request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is not set.
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            env::var(name).map_err(|_| {
                CbError::ConfigMissing(format!("{name} environment variable not set"))
            })
        };

        let url = required("CODEBEAMER_URL")?;
        let username = required("CODEBEAMER_USERNAME")?;
        let password = required("CODEBEAMER_PASSWORD")?;

        let mut builder = Self::builder(&url, &username, &password);
        if let Ok(secs) = env::var("CODEBEAMER_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                CbError::ConfigMissing(format!("CODEBEAMER_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Create a new client for the server at `url` using basic authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self> {
        Self::builder(url, username, password).build()
    }

    /// Start building a client with non-default settings.
    pub fn builder(url: &str, username: &str, password: &str) -> RestClientBuilder {
        RestClientBuilder {
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            api_root: DEFAULT_API_ROOT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Get the base URL (server URL plus API root).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .http
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(CbError::HttpError)?;

        Self::check_response("GET", path, response).await
    }

    /// Make a GET request with query parameters.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .http
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .query(query)
            .send()
            .await
            .map_err(CbError::HttpError)?;

        Self::check_response("GET", path, response).await
    }

    /// Make a PUT request with JSON body and query parameters.
    #[tracing::instrument(skip(self, query, body))]
    pub async fn put<Q: Serialize + ?Sized, B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
        body: &B,
    ) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .http
            .put(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .query(query)
            .json(body)
            .send()
            .await
            .map_err(CbError::HttpError)?;

        Self::check_response("PUT", path, response).await
    }

    /// Make a POST request with JSON body.
    #[tracing::instrument(skip(self, body))]
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .http
            .post(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .json(body)
            .send()
            .await
            .map_err(CbError::HttpError)?;

        Self::check_response("POST", path, response).await
    }

    /// Make a DELETE request.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<Response> {
        let url = self.base_url.join(path)?;

        let response = self
            .http
            .delete(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(CbError::HttpError)?;

        Self::check_response("DELETE", path, response).await
    }

    /// GET a path and decode the JSON body.
    pub(crate) async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let response = self.get(path).await?;
        response.json().await.map_err(CbError::HttpError)
    }

    /// Check response status and convert errors.
    async fn check_response(method: &str, path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("HTTP: {method} {path} -> {status}");

        if status.is_success() {
            return Ok(response);
        }

        // Handle rate limiting
        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(CbError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status.as_u16() == 404 {
            return Err(CbError::NotFound {
                entity_type: "resource",
                id: path.to_string(),
            });
        }

        let message = Self::extract_error_message(response, status).await;
        Err(CbError::ServerError {
            message,
            status_code: Some(status.as_u16()),
        })
    }

    /// Extract error message from a failed response.
    async fn extract_error_message(response: Response, status: reqwest::StatusCode) -> String {
        let body = match response.text().await {
            Ok(b) => b,
            Err(_) => return format!("HTTP {status}"),
        };

        // codeBeamer reports failures as {"exception": ..., "message": ...}
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body) {
            if let Some(msg) = json.get("message").and_then(|m| m.as_str()) {
                return msg.to_string();
            }
            if let Some(err) = json.get("exception").and_then(|m| m.as_str()) {
                return err.to_string();
            }
        }

        if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_debug() {
        let client = RestClient::new("https://cb.example.com", "bond", "secret-pw").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("RestClient"));
        assert!(debug.contains("base_url"));
        // Password should not be in debug output
        assert!(!debug.contains("secret-pw"));
    }

    #[test]
    fn test_base_url_includes_api_root() {
        let client1 = RestClient::new("https://cb.example.com", "u", "p").unwrap();
        let client2 = RestClient::new("https://cb.example.com/", "u", "p").unwrap();
        assert_eq!(client1.base_url().as_str(), "https://cb.example.com/cb/api/v3/");
        assert_eq!(client1.base_url().as_str(), client2.base_url().as_str());
    }

    #[test]
    fn test_builder_overrides_api_root() {
        let client = RestClient::builder("https://cb.example.com", "u", "p")
            .api_root("/api/v3/")
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://cb.example.com/api/v3/");
    }

    #[test]
    fn test_relative_paths_join_under_root() {
        let client = RestClient::new("https://cb.example.com", "u", "p").unwrap();
        let url = client.base_url().join("items/42/children").unwrap();
        assert_eq!(url.as_str(), "https://cb.example.com/cb/api/v3/items/42/children");
    }
}
