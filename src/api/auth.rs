//! Credential storage for the access/refresh token pair.
//!
//! The client never keeps its own copy of a token: every request reads the
//! current access token from a [`CredentialStore`], and a successful refresh
//! writes the new one back. Two backends are provided:
//!
//! - [`MemoryStore`] for tests and short-lived processes.
//! - [`KeychainStore`], backed by the OS keychain through the `keyring` crate,
//!   so a session survives between CLI invocations.

use std::sync::RwLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroize;

/// Keychain service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "com.sniffoutai.dashboard";

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "token";

/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Credential store operation failed: {0}")]
    OperationFailed(String),
    #[error("Stored credential is corrupt: {0}")]
    Corrupt(String),
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        StoreError::OperationFailed(err.to_string())
    }
}

/// Read/write access to the current credential pair.
///
/// Implementations must be shareable between concurrent requests. The
/// refresh token has no expiry managed here; it is written once at login.
pub trait CredentialStore: Send + Sync {
    /// Current access token, or `None` if absent or expired.
    fn access_token(&self) -> Result<Option<String>, StoreError>;

    /// Replace the access token; it stops being returned after `ttl`.
    fn set_access_token(&self, token: &str, ttl: Duration) -> Result<(), StoreError>;

    fn refresh_token(&self) -> Result<Option<String>, StoreError>;

    fn set_refresh_token(&self, token: &str) -> Result<(), StoreError>;

    /// Remove both tokens (sign-out).
    fn clear(&self) -> Result<(), StoreError>;
}

/// A token value with an absolute expiry in unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Zeroize)]
pub struct StoredToken {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl StoredToken {
    /// Token expiring `ttl` from now.
    pub fn expiring_in(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Some(unix_now().saturating_add(ttl.as_secs())),
        }
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ── In-memory store ──────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryTokens {
    access: Option<StoredToken>,
    refresh: Option<String>,
}

/// Process-local credential store.
///
/// Replaced and cleared token strings are zeroed before being dropped.
#[derive(Default)]
pub struct MemoryStore {
    tokens: RwLock<MemoryTokens>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a token pair, as if a login had just happened.
    pub fn with_tokens(access: &str, refresh: &str, ttl: Duration) -> Self {
        Self {
            tokens: RwLock::new(MemoryTokens {
                access: Some(StoredToken::expiring_in(access, ttl)),
                refresh: Some(refresh.to_string()),
            }),
        }
    }

    fn poisoned() -> StoreError {
        StoreError::OperationFailed("memory store lock poisoned".to_string())
    }
}

impl CredentialStore for MemoryStore {
    fn access_token(&self) -> Result<Option<String>, StoreError> {
        let tokens = self.tokens.read().map_err(|_| Self::poisoned())?;
        Ok(tokens
            .access
            .as_ref()
            .filter(|t| !t.is_expired())
            .map(|t| t.value.clone()))
    }

    fn set_access_token(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().map_err(|_| Self::poisoned())?;
        if let Some(ref mut old) = tokens.access {
            old.zeroize();
        }
        tokens.access = Some(StoredToken::expiring_in(token, ttl));
        Ok(())
    }

    fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        let tokens = self.tokens.read().map_err(|_| Self::poisoned())?;
        Ok(tokens.refresh.clone())
    }

    fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().map_err(|_| Self::poisoned())?;
        if let Some(ref mut old) = tokens.refresh {
            old.zeroize();
        }
        tokens.refresh = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().map_err(|_| Self::poisoned())?;
        if let Some(ref mut t) = tokens.access {
            t.zeroize();
        }
        if let Some(ref mut t) = tokens.refresh {
            t.zeroize();
        }
        tokens.access = None;
        tokens.refresh = None;
        Ok(())
    }
}

// ── OS keychain store ────────────────────────────────────────────────────

/// Credential store backed by the OS keychain.
///
/// The access token entry holds a JSON-encoded [`StoredToken`] so its expiry
/// survives restarts. The refresh token entry holds the raw token.
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key)?)
    }

    /// Returns `None` if no entry exists.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    /// Idempotent: a missing entry is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::from(e)),
        }
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

impl CredentialStore for KeychainStore {
    fn access_token(&self) -> Result<Option<String>, StoreError> {
        let Some(raw) = self.read(ACCESS_TOKEN_KEY)? else {
            return Ok(None);
        };
        let stored: StoredToken =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        if stored.is_expired() {
            log::debug!("Stored access token has expired");
            return Ok(None);
        }
        Ok(Some(stored.value))
    }

    fn set_access_token(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut encoded = serde_json::to_string(&StoredToken::expiring_in(token, ttl))
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let result = self.write(ACCESS_TOKEN_KEY, &encoded);
        encoded.zeroize();
        result
    }

    fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.read(REFRESH_TOKEN_KEY)
    }

    fn set_refresh_token(&self, token: &str) -> Result<(), StoreError> {
        self.write(REFRESH_TOKEN_KEY, token)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.delete(ACCESS_TOKEN_KEY)?;
        self.delete(REFRESH_TOKEN_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_memory_store_round_trip_and_clear() {
        let store = MemoryStore::new();
        store
            .set_access_token("access-1", Duration::from_secs(60))
            .unwrap();
        store.set_refresh_token("refresh-1").unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh-1"));

        store
            .set_access_token("access-2", Duration::from_secs(60))
            .unwrap();
        assert_eq!(store.access_token().unwrap().as_deref(), Some("access-2"));

        store.clear().unwrap();
        assert_eq!(store.access_token().unwrap(), None);
        assert_eq!(store.refresh_token().unwrap(), None);
    }

    #[test]
    fn test_memory_store_hides_expired_access_token() {
        let store = MemoryStore::with_tokens("stale", "refresh", Duration::ZERO);
        assert_eq!(store.access_token().unwrap(), None);
        // The refresh token has no managed expiry.
        assert_eq!(store.refresh_token().unwrap().as_deref(), Some("refresh"));
    }

    #[test]
    fn test_stored_token_expiry() {
        let token = StoredToken {
            value: "abc".to_string(),
            expires_at: Some(1_000),
        };
        assert!(!token.is_expired_at(999));
        assert!(token.is_expired_at(1_000));

        let forever = StoredToken {
            value: "abc".to_string(),
            expires_at: None,
        };
        assert!(!forever.is_expired_at(u64::MAX));
    }

    #[test]
    fn test_stored_token_json_shape() {
        let token = StoredToken {
            value: "abc".to_string(),
            expires_at: Some(42),
        };
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, r#"{"value":"abc","expires_at":42}"#);

        let parsed: StoredToken = serde_json::from_str(r#"{"value":"xyz"}"#).unwrap();
        assert_eq!(parsed.expires_at, None);
    }

    #[test]
    fn test_expiring_in_sets_future_expiry() {
        let token = StoredToken::expiring_in("abc", Duration::from_secs(86_400));
        assert!(!token.is_expired());
        assert!(token.expires_at.unwrap() >= unix_now() + 86_000);
    }
}
