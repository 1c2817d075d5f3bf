//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of HTTP clients
//! tuned for the AIHub portal. The portal authenticates every download
//! request with an `apikey` header, so the key is baked into the client's
//! default headers at build time.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::{http, limits};
use crate::errors::{AuthError, AuthResult};

/// Configuration for HTTP client behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum number of connections per host
    pub pool_max_per_host: usize,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

impl ClientConfig {
    /// Builds the HTTP client, attaching the API key header when given.
    ///
    /// The key header is marked sensitive so it never surfaces in debug
    /// output of the request.
    pub fn build_http_client(&self, api_key: Option<&str>) -> AuthResult<Client> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(key).map_err(|_| AuthError::InvalidKey {
                reason: "key contains characters not allowed in an HTTP header".to_string(),
            })?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(http::API_KEY_HEADER), value);
        }

        let mut client_builder = Client::builder()
            .default_headers(headers)
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .tcp_nodelay(self.tcp_nodelay)
            .pool_max_idle_per_host(self.pool_max_per_host);

        // Configure TCP keep-alive if specified
        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        // Configure connection pool idle timeout
        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(AuthError::Http)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config.tcp_nodelay);
        assert_eq!(config.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
    }

    #[test]
    fn test_http_client_creation_without_key() {
        let config = ClientConfig::default();
        let result = config.build_http_client(None);
        assert!(result.is_ok());
    }

    #[test]
    fn test_http_client_creation_with_key() {
        let config = ClientConfig::default();
        let result = config.build_http_client(Some("a1b2c3-apikey"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_key_with_control_characters_is_rejected() {
        let config = ClientConfig::default();
        let result = config.build_http_client(Some("bad\nkey"));
        assert!(matches!(result, Err(AuthError::InvalidKey { .. })));
    }

    #[test]
    fn test_http_client_with_custom_config() {
        let config = ClientConfig {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            ..Default::default()
        };

        let result = config.build_http_client(None);
        assert!(result.is_ok());
    }
}
