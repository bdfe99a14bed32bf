//! Login and sign-out flows built on top of [`ApiClient`].
//!
//! The client only reads tokens and rewrites the access token on refresh;
//! creating and destroying a session (writing both tokens after login,
//! clearing them on sign-out) happens here.

use reqwest::Method;

use crate::api::client::ApiClient;
use crate::api::error::ClientError;
use crate::api::request::ApiRequest;
use crate::api::types::{ApiResult, LoginRequest, LoginResponse};

/// Login endpoint, relative to the base URL.
pub const LOGIN_PATH: &str = "auth/login/";

/// Log in with email and password.
///
/// The request is sent without an access token, so a `401` for bad
/// credentials comes straight back as a failed result. On success both tokens
/// from `data.tokens` are written to the client's credential store.
pub async fn login(
    client: &ApiClient,
    email: &str,
    password: &str,
) -> Result<ApiResult, ClientError> {
    log::info!("Logging in as {}", email);

    let body = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };
    let request = ApiRequest::json(Method::POST, LOGIN_PATH, &body)?.without_auth();
    let result: ApiResult = client.send(request).await?;

    if result.is_success() {
        if establish_session(client, &result)? {
            log::info!("Login complete for {}", email);
        }
    } else {
        log::info!(
            "Login rejected: {}",
            result.error_message().unwrap_or("no message")
        );
    }

    Ok(result)
}

/// Store the token pair carried by a successful login-shaped response
/// (`{"data": {"tokens": {"access", "refresh"}}}`).
///
/// Returns `false` without touching the store if the response has no tokens.
pub fn establish_session(client: &ApiClient, result: &ApiResult) -> Result<bool, ClientError> {
    let Some(data) = result.data.as_ref().filter(|_| result.is_success()) else {
        return Ok(false);
    };

    let login: LoginResponse = match serde_json::from_value(data.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Login response carried no token pair: {}", e);
            return Ok(false);
        }
    };

    let store = client.credentials();
    store.set_access_token(&login.data.tokens.access, client.config().access_token_ttl)?;
    store.set_refresh_token(&login.data.tokens.refresh)?;
    Ok(true)
}

/// Forget both tokens. Subsequent calls go out unauthenticated.
pub fn sign_out(client: &ApiClient) -> Result<(), ClientError> {
    log::info!("Signing out");
    client.credentials().clear()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::api::auth::{CredentialStore, MemoryStore};
    use crate::config::ClientConfig;

    fn client_with(store: Arc<MemoryStore>) -> ApiClient {
        ApiClient::new(ClientConfig::new("http://127.0.0.1:9/"), store)
    }

    #[test]
    fn test_establish_session_stores_both_tokens() {
        let store = Arc::new(MemoryStore::new());
        let client = client_with(store.clone());
        let result = ApiResult::ok(json!({
            "data": {"tokens": {"access": "acc-1", "refresh": "ref-1"}, "user": {"id": 9}}
        }));

        assert!(establish_session(&client, &result).unwrap());
        assert_eq!(store.access_token().unwrap().as_deref(), Some("acc-1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("ref-1"));
    }

    #[test]
    fn test_establish_session_ignores_failures_and_missing_tokens() {
        let store = Arc::new(MemoryStore::new());
        let client = client_with(store.clone());

        let failed: ApiResult = ApiResult::failed(json!({"message": "Invalid credentials"}));
        assert!(!establish_session(&client, &failed).unwrap());

        let no_tokens = ApiResult::ok(json!({"data": {"user": {"id": 9}}}));
        assert!(!establish_session(&client, &no_tokens).unwrap());

        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_sign_out_clears_store() {
        let store = Arc::new(MemoryStore::with_tokens("a", "r", Duration::from_secs(60)));
        let client = client_with(store.clone());

        sign_out(&client).unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
    }
}
