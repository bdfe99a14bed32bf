//! Errors that reject an API call instead of producing an [`ApiResult`].
//!
//! Ordinary HTTP failures (4xx/5xx with a JSON body) are not errors: they are
//! returned as a failed [`ApiResult`]. Only transport failures, protocol
//! violations and credential store failures end up here.
//!
//! [`ApiResult`]: super::types::ApiResult

use thiserror::Error;

use super::auth::StoreError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body was not valid JSON.
    #[error("Malformed response body (status {status}): {source}")]
    MalformedBody {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The response was valid JSON but did not match the requested data type.
    #[error("Unexpected response data (status {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
