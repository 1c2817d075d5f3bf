//! Core HTTP operations with rate limiting and retry logic
//!
//! This module provides the fundamental HTTP request operations with
//! built-in resilience patterns: client-side rate limiting, exponential
//! backoff on transient failures, and special handling for the portal's
//! 429/503 answers.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::constants::limits;
use crate::errors::{AuthError, AuthResult, DownloadError, DownloadResult};

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    pub fn new(client: Client, rate_limit_rps: u32) -> AuthResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Builds the rate limiter with the specified rate limit
    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> AuthResult<RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>> {
        let quota = Quota::per_second(NonZeroU32::new(rate_limit_rps).ok_or_else(|| {
            AuthError::InvalidKey {
                reason: "Rate limit must be non-zero".to_string(),
            }
        })?);
        Ok(RateLimiter::direct(quota))
    }

    /// Exponential backoff delay for the given retry attempt
    fn backoff_delay(retries: u32) -> Duration {
        Duration::from_millis(limits::RETRY_BASE_DELAY_MS * 2_u64.pow(retries))
    }

    /// Fetches the HTTP response with rate limiting and retry logic.
    ///
    /// Returns the raw reqwest::Response so callers can stream the body or
    /// inspect non-success statuses (the portal encodes meaning into 502
    /// answers). 429 and 503 are retried with backoff; other statuses pass
    /// through untouched.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the HTTP request fails after retries
    pub async fn get_response(&self, url: &Url) -> DownloadResult<reqwest::Response> {
        // Apply rate limiting with jitter to avoid thundering herd
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let mut retries = 0;
        loop {
            let transient = match self.client.get(url.as_str()).send().await {
                Ok(response) => match response.status() {
                    StatusCode::TOO_MANY_REQUESTS => {
                        if retries >= limits::MAX_RETRIES {
                            return Err(DownloadError::RateLimitExceeded);
                        }
                        "rate limited by server (429)".to_string()
                    }
                    StatusCode::SERVICE_UNAVAILABLE => {
                        if retries >= limits::MAX_RETRIES {
                            return Err(DownloadError::ServerOverloaded);
                        }
                        "server overloaded (503)".to_string()
                    }
                    _ => {
                        tracing::debug!("Successfully fetched response: {}", url);
                        return Ok(response);
                    }
                },
                Err(e) => {
                    if retries >= limits::MAX_RETRIES {
                        tracing::error!(
                            "Request failed after {} retries: {}",
                            limits::MAX_RETRIES,
                            e
                        );
                        return Err(DownloadError::MaxRetriesExceeded {
                            max_retries: limits::MAX_RETRIES,
                        });
                    }
                    format!("request failed: {}", e)
                }
            };

            retries += 1;
            let delay = Self::backoff_delay(retries);
            tracing::warn!(
                "{} (attempt {}/{}). Retrying in {}ms",
                transient,
                retries,
                limits::MAX_RETRIES,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Fetches a response body as text with rate limiting.
    ///
    /// The portal fronts several endpoints with a gateway that answers 502
    /// while still carrying a meaningful body, so no status check happens
    /// here; callers decide what the status means.
    pub async fn get_text(&self, url: &Url) -> DownloadResult<(StatusCode, String)> {
        let response = self.get_response(url).await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("Fetched {} ({} bytes, {})", url, text.len(), status);
        Ok((status, text))
    }

    /// Get a reference to the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();

        // Test that rate limiter allows requests
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        let result = HttpHandler::build_rate_limiter(0);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_http_handler_creation() {
        let config = ClientConfig::default();
        let client = config.build_http_client(None).unwrap();
        let handler = HttpHandler::new(client, 5);
        assert!(handler.is_ok());
    }

    #[test]
    fn test_backoff_delay_doubles() {
        assert_eq!(HttpHandler::backoff_delay(1).as_millis(), 2000);
        assert_eq!(HttpHandler::backoff_delay(2).as_millis(), 4000);
        assert_eq!(HttpHandler::backoff_delay(3).as_millis(), 8000);
    }
}
