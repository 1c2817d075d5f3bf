//! HTTP client implementation for the AIHub portal
//!
//! This module provides the portal client with API-key authentication,
//! rate limiting, retrying, and streaming downloads.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `auth`: API key validation against the portal's probe endpoint
//! - `http`: Core HTTP operations with resilience patterns
//! - `download`: Streaming archive download with atomic completion

use std::path::Path;

use url::Url;

use crate::app::listing::{self, FileTree, Listing};
use crate::app::models::{DatasetEntry, FileSelection};
use crate::constants::portal;
use crate::errors::{ApiError, ApiResult, AuthResult, DownloadError, DownloadResult};

// Module declarations
pub mod auth;
pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;
pub use download::ProgressFn;

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client for interacting with the AIHub portal
///
/// Listings are public; downloads and key validation require the client to
/// have been built with an API key, which travels as a default header on
/// every request.
#[derive(Debug)]
pub struct AihubClient {
    http_handler: HttpHandler,
    base_url: Url,
}

impl AihubClient {
    /// Creates a client without an API key, sufficient for listings
    pub fn anonymous() -> AuthResult<Self> {
        Self::with_config(ClientConfig::default(), None)
    }

    /// Creates a client that authenticates with the given API key
    pub fn with_api_key(api_key: &str) -> AuthResult<Self> {
        Self::with_config(ClientConfig::default(), Some(api_key))
    }

    /// Creates a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the key cannot be carried in a header or the
    /// HTTP client fails to build
    pub fn with_config(config: ClientConfig, api_key: Option<&str>) -> AuthResult<Self> {
        let client = config.build_http_client(api_key)?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;
        let base_url = Url::parse(portal::BASE_URL).expect("portal base URL should be valid");

        tracing::debug!(
            "Created AIHub client ({})",
            if api_key.is_some() {
                "authenticated"
            } else {
                "anonymous"
            }
        );

        Ok(Self {
            http_handler,
            base_url,
        })
    }

    /// Fetch and parse the portal's dataset table
    pub async fn fetch_dataset_list(&self) -> ApiResult<Listing<Vec<DatasetEntry>>> {
        let url = self
            .base_url
            .join(portal::DATASET_LIST_PATH)
            .expect("dataset list path should be valid");
        let raw = self.fetch_listing_text(&url).await?;

        let cleaned = listing::clean_response(&raw);
        let datasets = listing::parse_dataset_list(&cleaned.body)?;
        Ok(Listing {
            value: datasets,
            notice: cleaned.notice,
        })
    }

    /// Fetch and parse the file tree of a dataset
    pub async fn fetch_file_tree(&self, dataset: &str) -> ApiResult<Listing<FileTree>> {
        let path = format!("{}/{}.do", portal::FILE_TREE_PATH, dataset);
        let url = self.base_url.join(&path).map_err(|e| ApiError::InvalidUrl {
            url: path.clone(),
            error: e.to_string(),
        })?;
        let raw = self.fetch_listing_text(&url).await?;

        let cleaned = listing::clean_response(&raw);
        let tree = listing::parse_file_tree(dataset, &cleaned.body)?;
        Ok(Listing {
            value: tree,
            notice: cleaned.notice,
        })
    }

    /// Fetch a listing body, tolerating the gateway's 502 answers
    async fn fetch_listing_text(&self, url: &Url) -> ApiResult<String> {
        let (status, text) = self.http_handler.get_text(url).await?;
        if !status.is_success() && status.as_u16() != 502 {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: url.path().to_string(),
            });
        }
        Ok(text)
    }

    /// Probe the portal to check whether this client's API key is accepted
    pub async fn validate_key(&self) -> AuthResult<()> {
        auth::validate_api_key(&self.http_handler).await
    }

    /// Download URL for a dataset and file selection
    pub fn download_url(
        &self,
        dataset: &str,
        selection: &FileSelection,
    ) -> DownloadResult<Url> {
        let path = format!("{}/{}.do", portal::DOWNLOAD_PATH, dataset);
        let mut url = self
            .base_url
            .join(&path)
            .map_err(|e| DownloadError::InvalidUrl {
                url: path.clone(),
                error: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("fileSn", &selection.file_sn());
        Ok(url)
    }

    /// Stream a dataset archive to `destination`.
    ///
    /// A 502 from the download endpoint means the account has not accepted
    /// the dataset's terms of use; the error carries the agreement URL the
    /// user must visit.
    pub async fn download_dataset(
        &self,
        dataset: &str,
        selection: &FileSelection,
        destination: &Path,
        force: bool,
        progress: ProgressFn<'_>,
    ) -> DownloadResult<()> {
        let url = self.download_url(dataset, selection)?;
        tracing::info!("Downloading dataset {} (fileSn={})", dataset, selection);

        let handler = DownloadHandler::new(&self.http_handler);
        match handler.download_file(&url, destination, force, progress).await {
            Err(DownloadError::ServerError { status: 502 }) => {
                Err(DownloadError::TermsNotAccepted {
                    dataset: dataset.to_string(),
                    agreement_url: format!("{}{}", portal::AGREEMENT_URL_PREFIX, dataset),
                })
            }
            other => other,
        }
    }

    /// Get the base URL for the portal
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_client_creation() {
        let client = AihubClient::anonymous().unwrap();
        assert_eq!(client.base_url().host_str(), Some("api.aihub.or.kr"));
    }

    #[test]
    fn test_download_url_all() {
        let client = AihubClient::anonymous().unwrap();
        let url = client
            .download_url("71265", &FileSelection::All)
            .unwrap();
        assert_eq!(url.path(), "/down/71265.do");
        assert_eq!(url.query(), Some("fileSn=all"));
    }

    #[test]
    fn test_download_url_with_keys() {
        let client = AihubClient::anonymous().unwrap();
        let selection =
            FileSelection::Keys(vec!["69412".to_string(), "69413".to_string()]);
        let url = client.download_url("571", &selection).unwrap();
        assert!(url.query().unwrap().starts_with("fileSn=69412"));
    }

    #[test]
    fn test_client_with_key() {
        let client = AihubClient::with_api_key("test-key-123");
        assert!(client.is_ok());
    }
}
