use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{watch, Mutex};

/// Errors that can occur with session storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt session file {path}: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Access token and user id must be stored together")]
    PartialCredentials,
}

/// Keys held by the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    AccessToken,
    UserId,
    UserName,
    PhoneNumber,
    ProfileComplete,
}

impl SessionKey {
    pub const ALL: [SessionKey; 5] = [
        SessionKey::AccessToken,
        SessionKey::UserId,
        SessionKey::UserName,
        SessionKey::PhoneNumber,
        SessionKey::ProfileComplete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::AccessToken => "access_token",
            SessionKey::UserId => "user_id",
            SessionKey::UserName => "user_name",
            SessionKey::PhoneNumber => "phone_number",
            SessionKey::ProfileComplete => "profile_complete",
        }
    }
}

/// Token and user id, which only ever exist as a pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub user_id: String,
}

/// Snapshot of everything the store holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub credentials: Option<Credentials>,
    pub user_name: Option<String>,
    pub phone_number: Option<String>,
    /// Server said the profile is complete, even if no name is stored yet
    pub profile_complete: bool,
}

impl Session {
    pub fn get(&self, key: SessionKey) -> Option<&str> {
        match key {
            SessionKey::AccessToken => self.credentials.as_ref().map(|c| c.access_token.as_str()),
            SessionKey::UserId => self.credentials.as_ref().map(|c| c.user_id.as_str()),
            SessionKey::UserName => self.user_name.as_deref(),
            SessionKey::PhoneNumber => self.phone_number.as_deref(),
            SessionKey::ProfileComplete => self.profile_complete.then_some("true"),
        }
    }

    /// Value for the `Authorization` header
    pub fn auth_header(&self) -> Option<String> {
        self.credentials
            .as_ref()
            .map(|c| format!("Bearer {}", c.access_token))
    }

    pub fn is_empty(&self) -> bool {
        self == &Session::default()
    }

    /// Build the session that results from applying `entries` on top of this one.
    fn apply(&self, entries: &[(SessionKey, String)]) -> Result<Session, StorageError> {
        let mut map = self.to_map();
        for (key, value) in entries {
            map.insert(key.as_str().to_string(), value.clone());
        }
        Session::from_map(map).ok_or(StorageError::PartialCredentials)
    }

    fn to_map(&self) -> BTreeMap<String, String> {
        SessionKey::ALL
            .iter()
            .filter_map(|key| self.get(*key).map(|v| (key.as_str().to_string(), v.to_string())))
            .collect()
    }

    /// `None` when only one half of the credential pair is present.
    fn from_map(mut map: BTreeMap<String, String>) -> Option<Session> {
        let token = map.remove(SessionKey::AccessToken.as_str());
        let user_id = map.remove(SessionKey::UserId.as_str());
        let credentials = match (token, user_id) {
            (Some(access_token), Some(user_id)) => Some(Credentials { access_token, user_id }),
            (None, None) => None,
            _ => return None,
        };

        Some(Session {
            credentials,
            user_name: map.remove(SessionKey::UserName.as_str()),
            phone_number: map.remove(SessionKey::PhoneNumber.as_str()),
            profile_complete: map.remove(SessionKey::ProfileComplete.as_str()).as_deref() == Some("true"),
        })
    }
}

/// Observable view of a single key
pub struct KeyWatch {
    key: SessionKey,
    rx: watch::Receiver<Session>,
    last: Option<String>,
}

impl KeyWatch {
    fn new(key: SessionKey, mut rx: watch::Receiver<Session>) -> Self {
        let last = rx.borrow_and_update().get(key).map(str::to_string);
        Self { key, rx, last }
    }

    pub fn current(&self) -> Option<String> {
        self.rx.borrow().get(self.key).map(str::to_string)
    }

    /// Wait until the key's value changes and return the new value.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Option<String>> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let now = self.rx.borrow_and_update().get(self.key).map(str::to_string);
            if now != self.last {
                self.last = now.clone();
                return Some(now);
            }
        }
    }
}

/// Durable key-value store for the signed-in session
///
/// The current snapshot is published on a `watch` channel only after the
/// backing file has been replaced, so readers see either the old or the new
/// session and never a half-applied write. Writers are serialised.
pub struct SessionStore {
    path: Option<PathBuf>,
    state: watch::Sender<Session>,
    write_lock: Mutex<()>,
}

impl SessionStore {
    /// Open a file-backed store, loading any session persisted earlier
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let session = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let corrupt = |reason: String| StorageError::Corrupt {
                    path: path.display().to_string(),
                    reason,
                };
                let map: BTreeMap<String, String> =
                    serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;
                Session::from_map(map)
                    .ok_or_else(|| corrupt("access token without user id".to_string()))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Session::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            "Opened session store at {} (signed in: {})",
            path.display(),
            session.credentials.is_some()
        );

        let (state, _) = watch::channel(session);
        Ok(Self {
            path: Some(path),
            state,
            write_lock: Mutex::new(()),
        })
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            path: None,
            state,
            write_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn read(&self, key: SessionKey) -> KeyWatch {
        KeyWatch::new(key, self.state.subscribe())
    }

    pub fn get(&self, key: SessionKey) -> Option<String> {
        self.state.borrow().get(key).map(str::to_string)
    }

    pub fn auth_header(&self) -> Option<String> {
        self.state.borrow().auth_header()
    }

    /// Apply several entries as one atomic update
    pub async fn write<I>(&self, entries: I) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = (SessionKey, String)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let _guard = self.write_lock.lock().await;

        let next = self.snapshot().apply(&entries)?;
        self.persist(&next).await?;
        self.state.send_replace(next);

        tracing::trace!("Session write: {:?}", entries.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>());
        Ok(())
    }

    pub async fn save_credentials(&self, access_token: &str, user_id: &str) -> Result<(), StorageError> {
        self.write([
            (SessionKey::AccessToken, access_token.to_string()),
            (SessionKey::UserId, user_id.to_string()),
        ])
        .await
    }

    /// Store the issued credentials and whether the profile is already complete, as one write
    pub async fn save_verification(
        &self,
        access_token: &str,
        user_id: &str,
        profile_complete: bool,
    ) -> Result<(), StorageError> {
        self.write([
            (SessionKey::AccessToken, access_token.to_string()),
            (SessionKey::UserId, user_id.to_string()),
            (SessionKey::ProfileComplete, profile_complete.to_string()),
        ])
        .await
    }

    pub async fn save_user_name(&self, name: &str) -> Result<(), StorageError> {
        self.write([(SessionKey::UserName, name.to_string())]).await
    }

    /// Record a finished profile setup: the display name and the completed flag together
    pub async fn save_profile(&self, name: &str) -> Result<(), StorageError> {
        self.write([
            (SessionKey::UserName, name.to_string()),
            (SessionKey::ProfileComplete, true.to_string()),
        ])
        .await
    }

    pub async fn save_phone_number(&self, phone_number: &str) -> Result<(), StorageError> {
        self.write([(SessionKey::PhoneNumber, phone_number.to_string())]).await
    }

    /// Remove every key
    pub async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let empty = Session::default();
        self.persist(&empty).await?;
        self.state.send_replace(empty);

        tracing::debug!("Session cleared");
        Ok(())
    }

    async fn persist(&self, session: &Session) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_vec_pretty(&session.to_map())?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_credentials_written_together() {
        let store = SessionStore::in_memory();
        store.save_credentials("tok", "user-1").await.unwrap();

        let session = store.snapshot();
        assert_eq!(session.get(SessionKey::AccessToken), Some("tok"));
        assert_eq!(session.get(SessionKey::UserId), Some("user-1"));
        assert_eq!(store.auth_header().as_deref(), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_partial_credentials_rejected() {
        let store = SessionStore::in_memory();
        let result = store.write([(SessionKey::AccessToken, "tok".to_string())]).await;
        assert!(matches!(result, Err(StorageError::PartialCredentials)));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = SessionStore::in_memory();
        store.save_phone_number("+919999999999").await.unwrap();
        store.save_credentials("tok", "user-1").await.unwrap();
        store.save_user_name("Asha").await.unwrap();

        store.clear().await.unwrap();

        assert!(store.snapshot().is_empty());
        assert_eq!(store.auth_header(), None);
    }

    #[tokio::test]
    async fn test_key_watch_sees_updates() {
        let store = SessionStore::in_memory();
        let mut name = store.read(SessionKey::UserName);
        assert_eq!(name.current(), None);

        store.save_phone_number("+919999999999").await.unwrap();
        store.save_user_name("Asha").await.unwrap();

        // The phone number write does not surface as a name change
        assert_eq!(name.changed().await, Some(Some("Asha".to_string())));
    }

    #[tokio::test]
    async fn test_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        {
            let store = SessionStore::open(&path).await.unwrap();
            store.save_credentials("tok", "user-1").await.unwrap();
            store.save_user_name("Asha").await.unwrap();
        }

        let store = SessionStore::open(&path).await.unwrap();
        let session = store.snapshot();
        assert_eq!(session.credentials.unwrap().access_token, "tok");
        assert_eq!(session.user_name.as_deref(), Some("Asha"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        assert!(matches!(
            SessionStore::open(&path).await,
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_half_credentials_on_disk_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, br#"{"access_token":"tok"}"#).await.unwrap();

        assert!(matches!(
            SessionStore::open(&path).await,
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_readers_only_see_persisted_credential_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = std::sync::Arc::new(SessionStore::open(&path).await.unwrap());
        let mut rx = store.subscribe();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move { store.save_credentials("tok", "user-1").await })
        };

        rx.changed().await.unwrap();
        let seen = rx.borrow_and_update().clone();
        let credentials = seen.credentials.expect("credentials published as a pair");
        assert_eq!(credentials.access_token, "tok");
        assert_eq!(credentials.user_id, "user-1");

        // The file was replaced before the snapshot was published
        let on_disk: BTreeMap<String, String> =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(on_disk.get("access_token").map(String::as_str), Some("tok"));
        assert_eq!(on_disk.get("user_id").map(String::as_str), Some("user-1"));

        writer.await.unwrap().unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_profile_flag_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        {
            let store = SessionStore::open(&path).await.unwrap();
            store.save_verification("tok", "user-1", true).await.unwrap();
        }

        let store = SessionStore::open(&path).await.unwrap();
        let session = store.snapshot();
        assert!(session.profile_complete);
        assert_eq!(session.get(SessionKey::ProfileComplete), Some("true"));
        assert_eq!(session.user_name, None);

        store.save_verification("tok2", "user-2", false).await.unwrap();
        assert!(!store.snapshot().profile_complete);
        assert_eq!(store.get(SessionKey::ProfileComplete), None);
    }

    #[tokio::test]
    async fn test_save_profile_marks_complete() {
        let store = SessionStore::in_memory();
        store.save_credentials("tok", "user-1").await.unwrap();
        store.save_profile("Asha").await.unwrap();

        let session = store.snapshot();
        assert_eq!(session.user_name.as_deref(), Some("Asha"));
        assert!(session.profile_complete);

        store.clear().await.unwrap();
        assert!(!store.snapshot().profile_complete);
    }
}
