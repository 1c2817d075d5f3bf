//! API key storage and resolution
//!
//! This module handles persistence, retrieval, and status reporting for the
//! AIHub API key. Validation against the portal lives with the HTTP client
//! in `app::client::auth`.

pub mod credentials;

pub use credentials::{
    is_valid_key, prompt_api_key, resolve_api_key, ApiKeySource, AuthStatus, CredentialStore,
    StoredCredential,
};
