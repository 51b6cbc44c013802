use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use error_stack::{report, ResultExt};
use google_sheets4::oauth2::storage::{TokenInfo, TokenStorage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

#[derive(Error, Debug)]
pub enum CredentialStoreError {
    #[error("Failed to read stored credential")]
    Read,
    #[error("Failed to write credential")]
    Write,
    #[error("Stored credential is malformed")]
    Malformed,
}

/// Access/refresh token pair plus expiry, as persisted between runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub id_token: Option<String>,
}

impl From<TokenInfo> for Credential {
    fn from(token: TokenInfo) -> Self {
        Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token
                .expires_at
                .and_then(|t| Utc.timestamp_opt(t.unix_timestamp(), t.nanosecond()).single()),
            id_token: token.id_token,
        }
    }
}

impl From<Credential> for TokenInfo {
    fn from(credential: Credential) -> Self {
        TokenInfo {
            access_token: credential.access_token,
            refresh_token: credential.refresh_token,
            expires_at: credential
                .expires_at
                .and_then(|t| time::OffsetDateTime::from_unix_timestamp(t.timestamp()).ok()),
            id_token: credential.id_token,
        }
    }
}

/// Where the sheet fetcher keeps its credential between runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the credential previously saved for a superset of `scopes`, if any.
    async fn load(
        &self,
        scopes: &[&str],
    ) -> error_stack::Result<Option<Credential>, CredentialStoreError>;

    async fn save(
        &self,
        scopes: &[&str],
        credential: Credential,
    ) -> error_stack::Result<(), CredentialStoreError>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct StoredCredential {
    scopes: Vec<String>,
    credential: Credential,
}

impl StoredCredential {
    fn new(scopes: &[&str], credential: Credential) -> Self {
        let mut scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        scopes.sort();
        scopes.dedup();
        Self { scopes, credential }
    }

    fn covers(&self, scopes: &[&str]) -> bool {
        scopes
            .iter()
            .all(|wanted| self.scopes.iter().any(|have| have == wanted))
    }
}

/// JSON file holding a single credential and the scopes it was granted for.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(
        &self,
        scopes: &[&str],
    ) -> error_stack::Result<Option<Credential>, CredentialStoreError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(report!(e)
                    .change_context(CredentialStoreError::Read)
                    .attach_printable(format!("path: {}", self.path.display())))
            }
        };

        let stored: StoredCredential = serde_json::from_slice(&contents)
            .change_context(CredentialStoreError::Malformed)
            .attach_printable_lazy(|| format!("path: {}", self.path.display()))?;

        if !stored.covers(scopes) {
            warn!(stored = ?stored.scopes, "Stored credential does not cover requested scopes");
            return Ok(None);
        }
        Ok(Some(stored.credential))
    }

    #[instrument(skip(self, credential), fields(path = %self.path.display()))]
    async fn save(
        &self,
        scopes: &[&str],
        credential: Credential,
    ) -> error_stack::Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .change_context(CredentialStoreError::Write)?;
        }
        let json = serde_json::to_vec_pretty(&StoredCredential::new(scopes, credential))
            .change_context(CredentialStoreError::Write)?;
        tokio::fs::write(&self.path, json)
            .await
            .change_context(CredentialStoreError::Write)
            .attach_printable_lazy(|| format!("path: {}", self.path.display()))
    }
}

/// Keeps the credential in process memory only.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    stored: Mutex<Option<StoredCredential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(scopes: &[&str], credential: Credential) -> Self {
        Self {
            stored: Mutex::new(Some(StoredCredential::new(scopes, credential))),
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.stored
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|s| s.credential.clone()))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(
        &self,
        scopes: &[&str],
    ) -> error_stack::Result<Option<Credential>, CredentialStoreError> {
        let guard = self
            .stored
            .lock()
            .map_err(|_| report!(CredentialStoreError::Read))?;
        Ok(guard
            .as_ref()
            .filter(|stored| stored.covers(scopes))
            .map(|stored| stored.credential.clone()))
    }

    async fn save(
        &self,
        scopes: &[&str],
        credential: Credential,
    ) -> error_stack::Result<(), CredentialStoreError> {
        let mut guard = self
            .stored
            .lock()
            .map_err(|_| report!(CredentialStoreError::Write))?;
        guard.replace(StoredCredential::new(scopes, credential));
        Ok(())
    }
}

/// Plugs a [`CredentialStore`] into the OAuth2 authenticator.
pub struct CredentialStorage(pub Arc<dyn CredentialStore>);

#[async_trait]
impl TokenStorage for CredentialStorage {
    async fn set(&self, scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        self.0
            .save(scopes, token.into())
            .await
            .map_err(|report| anyhow::anyhow!("{report:?}"))
    }

    async fn get(&self, scopes: &[&str]) -> Option<TokenInfo> {
        match self.0.load(scopes).await {
            Ok(credential) => credential.map(Into::into),
            Err(report) => {
                warn!("Ignoring unreadable stored credential: {report:?}");
                None
            }
        }
    }
}
