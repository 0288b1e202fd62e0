//! Request Gateway
//!
//! Single choke point for every REST call to the journal backend. The
//! gateway attaches the bearer token, applies the uniform abort timeout,
//! classifies responses into the [`ApiError`] taxonomy, and maintains the
//! shared backend-reachability flag.
//!
//! Each call is attempted exactly once. Retries are the caller's
//! responsibility: the gateway cannot assume idempotency, in particular for
//! multipart uploads.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::session::SessionStore;

/// Shape of the backend's JSON error body. Both `error` and `message` keys
/// are seen in the wild depending on the endpoint.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Authenticated HTTP dispatcher for the journal REST API.
#[derive(Clone)]
pub struct RequestGateway {
    http: Client,
    base_url: String,
    session: SessionStore,
    reachable: Arc<AtomicBool>,
}

impl RequestGateway {
    /// Create a gateway from config and a session handle.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(config.request.timeout)
            .build()
            .map_err(|e| ApiError::Network {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.request.base_url.trim_end_matches('/').to_string(),
            session,
            reachable: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The session handle this gateway authenticates against.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Whether the backend answered the most recent call.
    #[must_use]
    pub fn backend_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }

    /// Shared handle to the reachability flag, for components that gate on
    /// it (the notification channel opens only once this is true).
    #[must_use]
    pub fn reachable_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.reachable)
    }

    /// Make an authenticated GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let token = self.require_token()?;
        let request = self.http.get(self.url(path)).bearer_auth(token);
        self.execute(request).await
    }

    /// Make an authenticated GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let token = self.require_token()?;
        let request = self.http.get(self.url(path)).bearer_auth(token).query(query);
        self.execute(request).await
    }

    /// Make an authenticated POST request with a JSON body.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let token = self.require_token()?;
        let request = self.http.post(self.url(path)).bearer_auth(token).json(body);
        self.execute(request).await
    }

    /// Make an authenticated POST request with no body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let token = self.require_token()?;
        let request = self.http.post(self.url(path)).bearer_auth(token);
        self.execute(request).await
    }

    /// Make an authenticated PUT request with a JSON body.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let token = self.require_token()?;
        let request = self.http.put(self.url(path)).bearer_auth(token).json(body);
        self.execute(request).await
    }

    /// Make an authenticated DELETE request.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let token = self.require_token()?;
        let request = self.http.delete(self.url(path)).bearer_auth(token);
        let _: serde_json::Value = self.execute(request).await?;
        Ok(())
    }

    /// Make an authenticated multipart POST (uploads).
    ///
    /// The multipart encoder sets its own content type; no JSON header is
    /// attached.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let token = self.require_token()?;
        let request = self
            .http
            .post(self.url(path))
            .bearer_auth(token)
            .multipart(form);
        self.execute(request).await
    }

    /// Make an unauthenticated POST request (login/register only).
    pub async fn post_public<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.http.post(self.url(path)).json(body);
        self.execute(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Fail fast when logged out: no failed round trip just to learn what
    /// the session store already knows.
    fn require_token(&self) -> Result<String, ApiError> {
        self.session.token().ok_or(ApiError::Unauthenticated)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.reachable.store(false, Ordering::Relaxed);
                tracing::warn!(error = %e, "Backend unreachable");
                return Err(ApiError::Network {
                    message: e.to_string(),
                });
            }
        };

        // Any HTTP response means the backend is up, even an error status.
        self.reachable.store(true, Ordering::Relaxed);

        let status = response.status();

        if status.is_success() {
            let text = response.text().await.map_err(|e| ApiError::Network {
                message: e.to_string(),
            })?;
            if text.is_empty() {
                return serde_json::from_str("null").map_err(|e| ApiError::Decode {
                    message: e.to_string(),
                });
            }
            return serde_json::from_str(&text).map_err(|e| ApiError::Decode {
                message: e.to_string(),
            });
        }

        if status == StatusCode::UNAUTHORIZED {
            // Idempotent: only the first 401 across concurrent calls emits
            // the logout signal.
            self.session.clear();
            return Err(ApiError::Unauthenticated);
        }

        let message = extract_error_message(status, &response.text().await.unwrap_or_default());
        tracing::warn!(status = status.as_u16(), message = %message, "Request failed");
        Err(ApiError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

/// Pull a human-readable message out of a JSON error body, falling back to a
/// generic status description when the body is not parseable.
fn extract_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
