//! Client library for the SniffOutAI restaurant dashboard backend.

pub mod api;
pub mod config;
pub mod session;

pub use api::auth::{CredentialStore, KeychainStore, MemoryStore, StoreError};
pub use api::client::ApiClient;
pub use api::error::ClientError;
pub use api::request::{with_query, ApiRequest, MultipartBody};
pub use api::types::ApiResult;
pub use config::{ClientConfig, ConfigError};
