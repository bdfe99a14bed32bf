//! HTTP client with bearer auth injection and transparent token refresh.
//!
//! Every call reads the current access token from the injected
//! [`CredentialStore`]. When an authenticated call comes back `401`, the
//! client exchanges the stored refresh token for a new access token, writes
//! it back to the store and reissues the identical request exactly once.
//! Whatever the final response is, it is normalized into an [`ApiResult`].

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use super::auth::CredentialStore;
use super::error::ClientError;
use super::request::{ApiRequest, MultipartBody, RequestBody};
use super::types::{ApiResult, RefreshRequest, RefreshResponse};
use crate::config::ClientConfig;

/// HTTP client wrapper for SniffOut API communication.
///
/// Holds no credentials of its own. Share one instance (e.g. behind an
/// `Arc`) across the application.
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    credentials: Arc<dyn CredentialStore>,
    /// Serializes refreshes so concurrent 401s share one refresh call.
    refresh_gate: Mutex<()>,
}

impl ApiClient {
    /// Create a client for the configured backend using the given credential store.
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });
        Self {
            http,
            config,
            credentials,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResult<T>, ClientError> {
        self.send(ApiRequest::new(Method::GET, path)).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<ApiResult<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::json(Method::POST, path, body)?).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<ApiResult<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(ApiRequest::json(Method::PUT, path, body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<ApiResult<T>, ClientError> {
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }

    /// Multipart upload. The content type (with boundary) is left to the transport.
    pub async fn post_file<T: DeserializeOwned>(
        &self,
        path: &str,
        form: MultipartBody,
    ) -> Result<ApiResult<T>, ClientError> {
        self.send(ApiRequest::multipart(path, form)).await
    }

    /// Send a request, refreshing the access token and retrying once on `401`.
    ///
    /// Rejects only on transport errors, unparseable bodies, or credential
    /// store read failures; HTTP error statuses come back as a failed result.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<ApiResult<T>, ClientError> {
        let token = if request.include_auth() {
            self.credentials.access_token()?
        } else {
            None
        };

        let mut response = self.dispatch(&request, token.as_deref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED && request.include_auth() {
            if let Some(fresh) = self.refreshed_token(token.as_deref()).await {
                log::info!(
                    "Retrying {} {} with refreshed access token",
                    request.method(),
                    request.path()
                );
                response = self.dispatch(&request, Some(&fresh)).await?;
            }
        }

        normalize(response).await
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<Response, ClientError> {
        let url = self.config.url_for(request.path());
        log::debug!("{} {}", request.method(), url);

        let mut builder = self.http.request(request.method().clone(), &url);

        if let Some(t) = token {
            builder = builder.bearer_auth(t);
        }

        builder = match request.body() {
            RequestBody::Empty => builder.header(CONTENT_TYPE, "application/json"),
            RequestBody::Json(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
        };

        let response = builder.send().await?;
        log::debug!("{} {} -> {}", request.method(), url, response.status());
        Ok(response)
    }

    /// Obtain an access token to replace `stale`, the one a request was rejected with.
    ///
    /// If another request already replaced `stale` while this one waited for
    /// the gate, the stored token is reused without contacting the backend.
    async fn refreshed_token(&self, stale: Option<&str>) -> Option<String> {
        let _gate = self.refresh_gate.lock().await;

        match self.credentials.access_token() {
            Ok(Some(current)) if Some(current.as_str()) != stale => {
                log::debug!("Access token was already refreshed by a concurrent request");
                return Some(current);
            }
            Ok(_) => {}
            Err(e) => log::warn!("Failed to read access token before refresh: {}", e),
        }

        let fresh = self.request_access_token().await?;

        if let Err(e) = self
            .credentials
            .set_access_token(&fresh, self.config.access_token_ttl)
        {
            log::warn!("Failed to persist refreshed access token: {}", e);
        }

        Some(fresh)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Every failure is logged and reported as `None`.
    async fn request_access_token(&self) -> Option<String> {
        let refresh_token = match self.credentials.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                log::info!("No stored refresh token, token refresh skipped");
                return None;
            }
            Err(e) => {
                log::warn!("Failed to read refresh token: {}", e);
                return None;
            }
        };

        let url = self.config.url_for(&self.config.refresh_path);
        let body = RefreshRequest {
            refresh: refresh_token,
        };

        let resp = match self.http.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Token refresh request failed (network error): {}", e);
                return None;
            }
        };

        if !resp.status().is_success() {
            log::warn!("Token refresh rejected with status {}", resp.status());
            return None;
        }

        match resp.json::<RefreshResponse>().await {
            Ok(parsed) => match parsed.data.access {
                Some(token) if !token.is_empty() => {
                    log::info!("Access token refreshed");
                    Some(token)
                }
                _ => {
                    log::warn!("Token refresh response missing data.access");
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to parse token refresh response: {}", e);
                None
            }
        }
    }
}

/// Turn a response into an [`ApiResult`], consuming its body.
async fn normalize<T: DeserializeOwned>(response: Response) -> Result<ApiResult<T>, ClientError> {
    let status = response.status();
    if is_bodiless(status) {
        return Ok(ApiResult::empty());
    }
    let text = response.text().await?;
    envelope_from_parts(status, &text)
}

fn is_bodiless(status: StatusCode) -> bool {
    status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT
}

/// Build the result envelope from a status code and raw body text.
fn envelope_from_parts<T: DeserializeOwned>(
    status: StatusCode,
    text: &str,
) -> Result<ApiResult<T>, ClientError> {
    if is_bodiless(status) {
        return Ok(ApiResult::empty());
    }

    let body: Value = serde_json::from_str(text).map_err(|source| ClientError::MalformedBody {
        status: status.as_u16(),
        source,
    })?;

    if status.is_success() {
        let data = serde_json::from_value(body).map_err(|source| ClientError::Decode {
            status: status.as_u16(),
            source,
        })?;
        Ok(ApiResult::ok(data))
    } else {
        Ok(ApiResult::from_error_body(&body))
    }
}
