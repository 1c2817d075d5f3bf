//! Credential management for the AIHub API key
//!
//! The key is persisted as a small JSON file under the OS config directory,
//! with base64-encoded values and a format-version tag - the same on-disk
//! shape the upstream portal tooling writes. A key provided through the
//! environment always wins over the stored one.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::constants::{credentials, env as env_constants};
use crate::errors::{AuthError, AuthResult};

/// A stored API key with bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    /// The API key issued by the portal
    pub api_key: String,
    /// When the key last passed validation against the portal
    pub validated_at: Option<DateTime<Utc>>,
}

/// Where the active API key came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeySource {
    /// Taken from the `AIHUB_API_KEY` environment variable
    Environment(String),
    /// Loaded from the credential file
    Stored(StoredCredential),
}

impl ApiKeySource {
    /// The key itself, wherever it came from
    pub fn key(&self) -> &str {
        match self {
            Self::Environment(key) => key,
            Self::Stored(credential) => &credential.api_key,
        }
    }

    /// Short label for status output
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Environment(_) => "environment",
            Self::Stored(_) => "credential file",
        }
    }
}

/// JSON credential file access
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// A store backed by the given file path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The store at the platform's config location
    pub fn default_location() -> AuthResult<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            AuthError::CredentialStorage(io::Error::new(
                io::ErrorKind::NotFound,
                "no config directory on this platform",
            ))
        })?;
        Ok(Self::new(
            config_dir
                .join(credentials::CONFIG_DIR_NAME)
                .join(credentials::CREDENTIAL_FILE_NAME),
        ))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential.
    ///
    /// A missing file yields `None`. A file written by the retired
    /// credential scheme (wrong or absent version tag) is deleted and
    /// yields `None`, mirroring the upstream migration behavior. A file
    /// that cannot be parsed at all is an error.
    pub fn load(&self) -> AuthResult<Option<StoredCredential>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let fields: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|_| AuthError::CorruptCredentialFile {
                path: self.path.clone(),
            })?;

        let api_key = fields.get("api_key").and_then(|v| decode_field(v));
        let version = fields.get("version").and_then(|v| decode_field(v));

        match (api_key, version.as_deref()) {
            (Some(api_key), Some(credentials::CREDENTIAL_VERSION)) => {
                let validated_at = fields
                    .get("validated_at")
                    .and_then(|v| decode_field(v))
                    .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
                    .map(|dt| dt.with_timezone(&Utc));
                debug!("Loaded credential from {}", self.path.display());
                Ok(Some(StoredCredential {
                    api_key,
                    validated_at,
                }))
            }
            (Some(_), _) => {
                // Outdated credential: clear and require re-entry
                warn!(
                    "Discarding credential with outdated format in {}",
                    self.path.display()
                );
                self.clear()?;
                Ok(None)
            }
            _ => Err(AuthError::CorruptCredentialFile {
                path: self.path.clone(),
            }),
        }
    }

    /// Persist a credential, creating the config directory as needed
    pub fn save(&self, credential: &StoredCredential) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut fields = BTreeMap::new();
        fields.insert("api_key".to_string(), encode_field(&credential.api_key));
        fields.insert(
            "version".to_string(),
            encode_field(credentials::CREDENTIAL_VERSION),
        );
        if let Some(validated_at) = credential.validated_at {
            fields.insert(
                "validated_at".to_string(),
                encode_field(&validated_at.to_rfc3339()),
            );
        }

        let json = serde_json::to_string(&fields).expect("credential map serializes");
        fs::write(&self.path, json)?;

        // Restrict to owner read/write (Unix only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(credentials::CREDENTIAL_FILE_PERMISSIONS);
            fs::set_permissions(&self.path, perms)?;
        }

        debug!("Saved credential to {}", self.path.display());
        Ok(())
    }

    /// Delete the credential file. Returns whether a file was removed.
    pub fn clear(&self) -> AuthResult<bool> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            return Ok(true);
        }
        Ok(false)
    }
}

fn encode_field(value: &str) -> String {
    BASE64.encode(value)
}

fn decode_field(value: &str) -> Option<String> {
    BASE64
        .decode(value)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Resolve the active API key: environment first, then the store
pub fn resolve_api_key(store: &CredentialStore) -> AuthResult<Option<ApiKeySource>> {
    resolve_from(env::var(env_constants::API_KEY).ok(), store)
}

fn resolve_from(
    env_key: Option<String>,
    store: &CredentialStore,
) -> AuthResult<Option<ApiKeySource>> {
    if let Some(key) = env_key {
        let key = key.trim().to_string();
        if !key.is_empty() {
            return Ok(Some(ApiKeySource::Environment(key)));
        }
    }
    Ok(store.load()?.map(ApiKeySource::Stored))
}

/// Basic shape check before a key is sent anywhere
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_graphic())
}

/// Prompt for the API key without echoing it
pub fn prompt_api_key() -> AuthResult<String> {
    println!("An AIHub API key is required (issued on the AIHub website).");
    io::stdout().flush().map_err(AuthError::CredentialStorage)?;

    let key = rpassword::prompt_password("AIHub API key: ")
        .map_err(AuthError::CredentialStorage)?
        .trim()
        .to_string();

    if !is_valid_key(&key) {
        return Err(AuthError::InvalidKey {
            reason: "key must be non-empty printable ASCII".to_string(),
        });
    }
    Ok(key)
}

/// Authentication status for display
#[derive(Debug, Clone)]
pub struct AuthStatus {
    /// Active key source, if any
    pub source: Option<ApiKeySource>,
    /// Whether the key passed validation (None = not tested this run)
    pub key_valid: Option<bool>,
}

impl AuthStatus {
    /// Gather status from the environment and the store
    pub fn gather(store: &CredentialStore) -> AuthResult<Self> {
        Ok(Self {
            source: resolve_api_key(store)?,
            key_valid: None,
        })
    }

    /// Descriptive status message for display
    pub fn status_message(&self) -> String {
        match (&self.source, self.key_valid) {
            (None, _) => "No API key configured - run 'auth login' to set one".to_string(),
            (Some(source), None) => {
                format!("API key configured ({}), not verified", source.describe())
            }
            (Some(source), Some(true)) => {
                format!("API key configured ({}) and verified", source.describe())
            }
            (Some(source), Some(false)) => {
                format!("API key configured ({}) but rejected", source.describe())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("credentials.json"))
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let credential = StoredCredential {
            api_key: "my-secret-key".to_string(),
            validated_at: Some(Utc::now()),
        };
        store.save(&credential).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.api_key, "my-secret-key");
        assert!(loaded.validated_at.is_some());
    }

    #[test]
    fn test_values_are_base64_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(&StoredCredential {
                api_key: "plaintext-key".to_string(),
                validated_at: None,
            })
            .unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("plaintext-key"));
        assert!(raw.contains(&BASE64.encode("plaintext-key")));
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(store_in(&dir).load().unwrap().is_none());
    }

    #[test]
    fn test_outdated_version_is_discarded() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut fields = BTreeMap::new();
        fields.insert("api_key".to_string(), BASE64.encode("old-key"));
        fields.insert("version".to_string(), BASE64.encode("1"));
        fs::write(store.path(), serde_json::to_string(&fields).unwrap()).unwrap();

        assert!(store.load().unwrap().is_none());
        // The stale file was cleared so the next run prompts cleanly
        assert!(!store.path().exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not json at all").unwrap();

        assert!(matches!(
            store.load(),
            Err(AuthError::CorruptCredentialFile { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(!store.clear().unwrap());

        store
            .save(&StoredCredential {
                api_key: "k".to_string(),
                validated_at: None,
            })
            .unwrap();
        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_environment_overrides_store() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(&StoredCredential {
                api_key: "stored-key".to_string(),
                validated_at: None,
            })
            .unwrap();

        let resolved = resolve_from(Some("env-key".to_string()), &store)
            .unwrap()
            .unwrap();
        assert_eq!(resolved, ApiKeySource::Environment("env-key".to_string()));

        let resolved = resolve_from(None, &store).unwrap().unwrap();
        assert_eq!(resolved.key(), "stored-key");

        // Blank environment values fall through to the store
        let resolved = resolve_from(Some("  ".to_string()), &store)
            .unwrap()
            .unwrap();
        assert_eq!(resolved.key(), "stored-key");
    }

    #[test]
    fn test_key_format_validation() {
        assert!(is_valid_key("abc-123_XYZ"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("has space"));
        assert!(!is_valid_key("tab\there"));
    }

    #[test]
    fn test_status_messages() {
        let mut status = AuthStatus {
            source: None,
            key_valid: None,
        };
        assert!(status.status_message().contains("auth login"));

        status.source = Some(ApiKeySource::Environment("k".to_string()));
        assert!(status.status_message().contains("not verified"));

        status.key_valid = Some(true);
        assert!(status.status_message().contains("verified"));

        status.key_valid = Some(false);
        assert!(status.status_message().contains("rejected"));
    }

    #[cfg(unix)]
    #[test]
    fn test_credential_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(&StoredCredential {
                api_key: "k".to_string(),
                validated_at: None,
            })
            .unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
