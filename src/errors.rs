//! Error types for AIHub Fetcher
//!
//! This module defines comprehensive error types for all components of the
//! application. Errors are designed to be actionable and provide clear
//! context for debugging and user feedback.

use std::path::PathBuf;
use thiserror::Error;

/// Authentication and credential errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// No API key available from environment or credential store
    #[error(
        "No AIHub API key configured. Set the AIHUB_API_KEY environment variable or run 'auth login'"
    )]
    MissingApiKey,

    /// HTTP client could not be constructed
    #[error("HTTP client setup failed")]
    Http(#[from] reqwest::Error),

    /// HTTP transfer failed during key validation
    #[error("Key validation request failed")]
    ValidationRequest(#[source] DownloadError),

    /// The portal rejected the API key
    #[error("AIHub rejected the API key. Check the key and try again")]
    KeyRejected,

    /// Validation response matched neither the accept nor the reject phrases
    #[error("Unrecognized key-validation response from the portal. The API may have changed")]
    UnrecognizedResponse,

    /// Key has an invalid format (empty, embedded whitespace)
    #[error("Invalid API key format: {reason}")]
    InvalidKey { reason: String },

    /// File I/O error during credential storage
    #[error("Failed to access the credential store")]
    CredentialStorage(#[from] std::io::Error),

    /// Credential file exists but cannot be parsed
    #[error("Corrupt credential file: {path}")]
    CorruptCredentialFile { path: PathBuf },
}

/// Listing and response parsing errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport-level failure from the HTTP layer
    #[error(transparent)]
    Transport(#[from] DownloadError),

    /// Listing endpoint returned a non-success status
    #[error("Portal returned HTTP {status} for {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    /// Dataset table response contained no parsable rows
    #[error("Dataset listing was empty or unparsable")]
    EmptyDatasetList,

    /// File tree response could not be parsed
    #[error("Could not parse the file tree for dataset {dataset}: {reason}")]
    MalformedFileTree { dataset: String, reason: String },

    /// Requested file key not present in the dataset's tree
    #[error("File key {key} not found in dataset {dataset}")]
    UnknownFileKey { dataset: String, key: String },

    /// Invalid URL constructed from user input
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },
}

/// Download and HTTP transfer errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Target archive already exists and force flag not set
    #[error("File already exists: {path}. Use --force to overwrite")]
    FileExists { path: String },

    /// I/O error during file operations
    #[error("File I/O error")]
    Io(#[from] std::io::Error),

    /// Invalid URL constructed from user input
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Download endpoint answered 502: the dataset's terms of use have not
    /// been accepted for this account
    #[error(
        "Terms of use not accepted for dataset {dataset}. Visit {agreement_url} and accept the terms, then retry"
    )]
    TermsNotAccepted {
        dataset: String,
        agreement_url: String,
    },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded for download")]
    MaxRetriesExceeded { max_retries: u32 },

    /// Stream ended short of the advertised content length
    #[error("Incomplete download: received {received} bytes, expected {expected} bytes")]
    IncompleteDownload { received: u64, expected: u64 },
}

/// Archive extraction and part-merge errors
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O error during extraction or merge
    #[error("File I/O error during extraction")]
    Io(#[from] std::io::Error),

    /// Downloaded archive is missing or unreadable
    #[error("Archive not found: {path}")]
    ArchiveNotFound { path: PathBuf },

    /// A split file's part sequence has a gap; nothing is merged
    #[error("Incomplete part set for {target}: part {missing_index} is absent")]
    MissingPart {
        target: PathBuf,
        missing_index: u32,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Configuration could not be serialized for the first-run write
    #[error("Could not serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// I/O error reading or writing the config file
    #[error("Configuration file I/O error")]
    Io(#[from] std::io::Error),

    /// No usable config directory on this platform
    #[error("Could not determine a configuration directory for this platform")]
    NoConfigDir,
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Listing/parsing error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Extraction/merge error
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Download(DownloadError::Http(_))
                | AppError::Download(DownloadError::RateLimitExceeded)
                | AppError::Download(DownloadError::ServerOverloaded)
                | AppError::Api(ApiError::Transport(_))
                | AppError::Auth(AuthError::ValidationRequest(_))
        )
    }

    /// Get error category for logging and user-facing summaries
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Api(_) => "api",
            AppError::Download(_) => "download",
            AppError::Extract(_) => "extract",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Listing result type alias
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Extraction result type alias
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let auth: AppError = AuthError::KeyRejected.into();
        assert_eq!(auth.category(), "authentication");
        assert!(!auth.is_recoverable());

        let overloaded: AppError = DownloadError::ServerOverloaded.into();
        assert_eq!(overloaded.category(), "download");
        assert!(overloaded.is_recoverable());
    }

    #[test]
    fn test_terms_error_carries_agreement_url() {
        let err = DownloadError::TermsNotAccepted {
            dataset: "71265".to_string(),
            agreement_url: "https://aihub.or.kr/aihubdata/data/dwld.do?dataSetSn=71265"
                .to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("71265"));
        assert!(message.contains("dwld.do"));
    }

    #[test]
    fn test_missing_part_names_index() {
        let err = ExtractError::MissingPart {
            target: PathBuf::from("data/images.zip"),
            missing_index: 3,
        };
        assert!(err.to_string().contains("part 3"));
    }
}
