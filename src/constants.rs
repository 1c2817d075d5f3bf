//! Application constants for AIHub Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names for authentication
pub mod env {
    /// Environment variable holding the AIHub API key.
    /// Takes precedence over the stored credential file.
    pub const API_KEY: &str = "AIHUB_API_KEY";
}

/// Credential storage constants
pub mod credentials {
    /// On-disk credential format version. Keys saved by the retired
    /// id/password scheme carry no version and are discarded on load.
    pub const CREDENTIAL_VERSION: &str = "2";

    /// Directory under the OS config root holding our files
    pub const CONFIG_DIR_NAME: &str = "aihub-fetcher";

    /// Credential file name inside the config directory
    pub const CREDENTIAL_FILE_NAME: &str = "credentials.json";

    /// Application config file name inside the config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// File permissions for the credential file (Unix only) - owner read/write
    #[cfg(unix)]
    pub const CREDENTIAL_FILE_PERMISSIONS: u32 = 0o600;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "AIHub-Fetcher/0.2.0 (Dataset Download Tool)";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 4;

    /// Header carrying the API key on authenticated requests
    pub const API_KEY_HEADER: &str = "apikey";
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for portal requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

    /// Maximum retry attempts for failed requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
}

/// AIHub portal URLs and endpoints
pub mod portal {
    /// AIHub API base URL
    pub const BASE_URL: &str = "https://api.aihub.or.kr";

    /// Dataset table endpoint (plain text, unauthenticated)
    pub const DATASET_LIST_PATH: &str = "/info/dataset.do";

    /// File tree endpoint prefix; append `{dataset_key}.do`
    pub const FILE_TREE_PATH: &str = "/info";

    /// Download endpoint prefix; append `{dataset_key}.do?fileSn={keys}`
    pub const DOWNLOAD_PATH: &str = "/down";

    /// Key validation probe. Dataset `-1` never exists; the body tells us
    /// whether the key itself was accepted.
    pub const KEY_VALIDATE_PATH: &str = "/down/0.5/-1.do";

    /// Terms-of-use agreement page shown when a download returns 502;
    /// append the dataset key.
    pub const AGREEMENT_URL_PREFIX: &str =
        "https://aihub.or.kr/aihubdata/data/dwld.do?dataSetSn=";
}

/// Body phrases used to classify the key-validation response.
///
/// The validation endpoint sits behind a gateway that answers HTTP 502 for
/// every outcome, so status codes carry no signal and the body text decides.
pub mod validation {
    /// Phrases present when the key was accepted ("file can be downloaded" /
    /// "dataset has no such file" - the probe dataset never exists, so the
    /// second phrase still means the key itself passed).
    pub const SUCCESS_PHRASES: &[&str] = &[
        "요청하신 파일을 다운로드할 수 있습니다",
        "요청하신 데이터셋의 파일이 존재하지 않습니다",
    ];

    /// Phrases present when authentication was rejected
    /// (인증 "authentication", 권한 "privilege", API, 키 "key").
    pub const FAILURE_PHRASES: &[&str] = &["인증", "권한", "API", "키"];
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Name of the archive the portal streams for a dataset download
    pub const ARCHIVE_FILE_NAME: &str = "dataset.tar";

    /// Split files end in `.part{N}`; reassembled after extraction
    pub const PART_SUFFIX: &str = ".part";
}

/// Progress reporting and monitoring
pub mod progress {
    use super::Duration;

    /// Spinner/progress redraw interval
    pub const TICK_INTERVAL: Duration = Duration::from_millis(120);
}

// Re-export commonly used constants for convenience
pub use env::API_KEY as ENV_API_KEY;
pub use files::{ARCHIVE_FILE_NAME, PART_SUFFIX, TEMP_FILE_SUFFIX};
pub use http::{API_KEY_HEADER, DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_RETRIES, RETRY_BASE_DELAY_MS};
pub use portal::BASE_URL as PORTAL_BASE_URL;
