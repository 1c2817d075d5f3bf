//! Archive download with streaming writes and atomic completion
//!
//! Dataset archives can run to hundreds of gigabytes, so the body is
//! streamed to disk chunk by chunk with progress reported to the caller.
//! The atomic temp file + rename pattern keeps an interrupted download
//! from being mistaken for a finished archive.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::{files, limits};
use crate::errors::{DownloadError, DownloadResult};

/// Progress callback: bytes received so far and the advertised total, when
/// the server sent a content length
pub type ProgressFn<'p> = &'p mut (dyn FnMut(u64, Option<u64>) + Send);

/// File download operations handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler) -> Self {
        Self { http_handler }
    }

    /// Downloads the archive at `url` to `destination`.
    ///
    /// The body streams into `{destination}.tmp` and is renamed into place
    /// only once the stream completed and matched the advertised length.
    /// Transient failures retry with exponential backoff; protocol errors
    /// (an HTTP error status) surface immediately so callers can interpret
    /// them.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The file already exists and force is false
    /// - The server answers with an error status
    /// - The transfer keeps failing after retries
    pub async fn download_file(
        &self,
        url: &Url,
        destination: &Path,
        force: bool,
        progress: ProgressFn<'_>,
    ) -> DownloadResult<()> {
        if destination.exists() && !force {
            return Err(DownloadError::FileExists {
                path: destination.display().to_string(),
            });
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = temp_path_for(destination);

        let mut retries = 0;
        loop {
            match self.download_attempt(url, &temp_path, &mut *progress).await {
                Ok(()) => {
                    tokio::fs::rename(&temp_path, destination).await.map_err(
                        |_e| DownloadError::AtomicOperationFailed {
                            temp_path: temp_path.clone(),
                            final_path: destination.to_path_buf(),
                        },
                    )?;
                    tracing::info!("Successfully downloaded: {}", destination.display());
                    return Ok(());
                }
                Err(e) if is_transient(&e) && retries < limits::MAX_RETRIES => {
                    retries += 1;
                    let delay = std::time::Duration::from_millis(
                        limits::RETRY_BASE_DELAY_MS * 2_u64.pow(retries),
                    );
                    tracing::warn!(
                        "Download failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        limits::MAX_RETRIES,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    // Clean up temp file on final failure
                    if temp_path.exists() {
                        let _ = tokio::fs::remove_file(&temp_path).await;
                    }
                    tracing::error!("Download failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Streams one download attempt into the temporary file
    async fn download_attempt(
        &self,
        url: &Url,
        temp_path: &Path,
        progress: ProgressFn<'_>,
    ) -> DownloadResult<()> {
        let mut response = self.http_handler.get_response(url).await?;

        if !response.status().is_success() {
            return Err(DownloadError::ServerError {
                status: response.status().as_u16(),
            });
        }

        let expected = response.content_length();
        progress(0, expected);

        let mut file = File::create(temp_path).await?;
        let mut received: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            progress(received, expected);
        }
        file.flush().await?;

        if let Some(expected) = expected {
            if received != expected {
                return Err(DownloadError::IncompleteDownload { received, expected });
            }
        }

        Ok(())
    }
}

/// Temporary path used while a download is in flight
fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(files::TEMP_FILE_SUFFIX);
    destination.with_file_name(name)
}

/// Whether a failed attempt is worth retrying
fn is_transient(error: &DownloadError) -> bool {
    matches!(
        error,
        DownloadError::Http(_)
            | DownloadError::Io(_)
            | DownloadError::IncompleteDownload { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::fs;

    use crate::app::client::config::ClientConfig;
    use crate::app::client::http::HttpHandler;

    fn create_test_handler() -> HttpHandler {
        let config = ClientConfig::default();
        let client = config.build_http_client(None).unwrap();
        HttpHandler::new(client, 5).unwrap()
    }

    #[tokio::test]
    async fn test_download_file_already_exists() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("dataset.tar");
        fs::write(&file_path, "existing content").await.unwrap();

        let http_handler = create_test_handler();
        let download_handler = DownloadHandler::new(&http_handler);

        let url = Url::parse("https://example.com/down/1.do").unwrap();
        let mut on_progress = |_received: u64, _total: Option<u64>| {};

        let result = download_handler
            .download_file(&url, &file_path, false, &mut on_progress)
            .await;

        match result.unwrap_err() {
            DownloadError::FileExists { .. } => {}
            other => panic!("Expected DownloadError::FileExists, got {:?}", other),
        }
    }

    #[test]
    fn test_temp_path_generation() {
        let temp = temp_path_for(Path::new("/tmp/out/dataset.tar"));
        assert!(temp.to_string_lossy().ends_with("dataset.tar.tmp"));
        assert_eq!(temp.parent(), Some(Path::new("/tmp/out")));

        let no_ext = temp_path_for(Path::new("/tmp/archive"));
        assert!(no_ext.to_string_lossy().ends_with("archive.tmp"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&DownloadError::IncompleteDownload {
            received: 1,
            expected: 2
        }));
        assert!(!is_transient(&DownloadError::ServerError { status: 502 }));
        assert!(!is_transient(&DownloadError::FileExists {
            path: "x".to_string()
        }));
    }
}
