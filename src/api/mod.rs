//! API client module for the SniffOut backend.
//!
//! Provides the authenticated HTTP client with transparent token refresh,
//! credential storage, request descriptors, and the `{success, data, error}`
//! result envelope every call resolves to.

pub mod auth;
pub mod client;
pub mod error;
pub mod request;
pub mod types;
