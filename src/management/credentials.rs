use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{Error, Res, config, types::Credential};

/// Key/value persistence for the signed-in grant and the transient PKCE
/// verifier.
///
/// Implementations must apply each call atomically: a reader never sees a
/// new access token next to a stale refresh token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn read(&self) -> Res<Option<Credential>>;

    async fn replace(&self, credential: Credential) -> Res<()>;

    /// Stores the credential of a completed login and drops the PKCE
    /// verifier in the same write.
    async fn store_grant(&self, credential: Credential) -> Res<()>;

    /// Removes every entry, the PKCE verifier included.
    async fn clear(&self) -> Res<()>;

    async fn read_verifier(&self) -> Res<Option<String>>;

    async fn store_verifier(&self, verifier: String) -> Res<()>;
}

/// On-disk layout: four scalar entries, no nesting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntries {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Epoch millis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

impl StoredEntries {
    pub fn credential(&self) -> Option<Credential> {
        let access_token = self.access_token.clone()?;
        let expires_at: DateTime<Utc> = Utc.timestamp_millis_opt(self.expires_at?).single()?;
        Some(Credential {
            access_token,
            refresh_token: self.refresh_token.clone(),
            expires_at,
        })
    }

    fn with_grant(&self, credential: Credential) -> Self {
        Self {
            code_verifier: None,
            ..self.with_credential(credential)
        }
    }

    fn with_credential(&self, credential: Credential) -> Self {
        Self {
            access_token: Some(credential.access_token),
            refresh_token: credential.refresh_token,
            expires_at: Some(credential.expires_at.timestamp_millis()),
            code_verifier: self.code_verifier.clone(),
        }
    }
}

/// Process-local store, used by tests and by front ends that do not persist.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<StoredEntries>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that starts out signed in.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            entries: Mutex::new(StoredEntries::default().with_credential(credential)),
        }
    }

    pub async fn entries(&self) -> StoredEntries {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn read(&self) -> Res<Option<Credential>> {
        Ok(self.entries.lock().await.credential())
    }

    async fn replace(&self, credential: Credential) -> Res<()> {
        let mut entries = self.entries.lock().await;
        *entries = entries.with_credential(credential);
        Ok(())
    }

    async fn store_grant(&self, credential: Credential) -> Res<()> {
        let mut entries = self.entries.lock().await;
        *entries = entries.with_grant(credential);
        Ok(())
    }

    async fn clear(&self) -> Res<()> {
        *self.entries.lock().await = StoredEntries::default();
        Ok(())
    }

    async fn read_verifier(&self) -> Res<Option<String>> {
        Ok(self.entries.lock().await.code_verifier.clone())
    }

    async fn store_verifier(&self, verifier: String) -> Res<()> {
        self.entries.lock().await.code_verifier = Some(verifier);
        Ok(())
    }
}

/// JSON file store under the local data directory.
///
/// Every mutation writes a sibling temp file and renames it over the target,
/// then swaps the in-memory copy while still holding the lock.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    entries: Mutex<StoredEntries>,
}

impl FileCredentialStore {
    /// Opens `vinylshelf/cache/credentials.json` in the local data directory.
    pub async fn open_default() -> Res<Self> {
        Self::open(Self::default_path()).await
    }

    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// [`Error::Store`] if the file exists but is not valid JSON, and
    /// [`Error::Io`] if it cannot be read.
    ///
    /// # Example
    ///
    /// ```
    /// let store = FileCredentialStore::open("/tmp/vinylshelf/credentials.json").await?;
    /// let credential = store.read().await?;
    /// ```
    pub async fn open(path: impl Into<PathBuf>) -> Res<Self> {
        let path = path.into();
        let entries = match async_fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => StoredEntries::default(),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| Error::Store(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredEntries::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_path() -> PathBuf {
        let mut path = config::data_dir();
        path.push("cache/credentials.json");
        path
    }

    async fn persist(&self, entries: &StoredEntries) -> Res<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn update<F>(&self, change: F) -> Res<()>
    where
        F: FnOnce(&StoredEntries) -> StoredEntries + Send,
    {
        let mut entries = self.entries.lock().await;
        let next = change(&*entries);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn read(&self) -> Res<Option<Credential>> {
        Ok(self.entries.lock().await.credential())
    }

    async fn replace(&self, credential: Credential) -> Res<()> {
        self.update(|current| current.with_credential(credential)).await
    }

    async fn store_grant(&self, credential: Credential) -> Res<()> {
        self.update(|current| current.with_grant(credential)).await
    }

    async fn clear(&self) -> Res<()> {
        let mut entries = self.entries.lock().await;
        match async_fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *entries = StoredEntries::default();
        Ok(())
    }

    async fn read_verifier(&self) -> Res<Option<String>> {
        Ok(self.entries.lock().await.code_verifier.clone())
    }

    async fn store_verifier(&self, verifier: String) -> Res<()> {
        self.update(|current| StoredEntries {
            code_verifier: Some(verifier),
            ..current.clone()
        })
        .await
    }
}
