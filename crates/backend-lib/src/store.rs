// ============================
// crates/backend-lib/src/store.rs
// ============================
//! Storage abstraction with flat-file implementation.
use crate::error::AppError;
use async_trait::async_trait;
use chrono::Utc;
use convoy_common::{GeoPoint, JourneySession, LocationRecord, UserIdentity};
use dashmap::DashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs as tokio_fs, io::AsyncWriteExt, sync::Mutex};
use uuid::Uuid;

/// Trait for storage backends
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new session. Returns `false` if the code is already taken.
    async fn insert_session(&self, session: &JourneySession) -> Result<bool, AppError>;

    /// Look up a session by its shareable code
    async fn session_by_code(&self, code: &str) -> Result<Option<JourneySession>, AppError>;

    /// Look up a session by its id
    async fn session_by_id(&self, id: Uuid) -> Result<Option<JourneySession>, AppError>;

    /// Add a member if absent. Atomic with respect to concurrent joins.
    /// Returns the updated session, or `None` if the code is unknown.
    async fn add_member(
        &self,
        code: &str,
        user: &UserIdentity,
    ) -> Result<Option<JourneySession>, AppError>;

    /// Replace the destination. Returns the updated session, or `None`
    /// if the id is unknown.
    async fn set_destination(
        &self,
        id: Uuid,
        destination: GeoPoint,
    ) -> Result<Option<JourneySession>, AppError>;

    /// Append one position sample to the journey's location log
    async fn append_location(&self, code: &str, record: &LocationRecord)
        -> Result<(), AppError>;

    /// Read all persisted position samples for a journey
    async fn read_locations(&self, code: &str) -> Result<Vec<LocationRecord>, AppError>;
}

struct Inner {
    root: PathBuf,
    /// id -> code, for by-id lookup without scanning
    index: DashMap<Uuid, String>,
    /// per-code write locks so read-modify-write never loses a concurrent join
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Flat-file implementation of the Store trait.
/// Layout: `<root>/active-journeys/<CODE>/session.json` + `locations.log`.
#[derive(Clone)]
pub struct FlatFileStore {
    inner: Arc<Inner>,
}

impl FlatFileStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("active-journeys"))?;

        let index = DashMap::new();
        for entry in fs::read_dir(root.join("active-journeys"))? {
            let path = entry?.path().join("session.json");
            if !path.is_file() {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let session: JourneySession = serde_json::from_str(&content)?;
            index.insert(session.id, session.code);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                root,
                index,
                locks: DashMap::new(),
            }),
        })
    }

    fn session_dir(&self, code: &str) -> PathBuf {
        self.inner.root.join("active-journeys").join(code)
    }

    fn write_lock(&self, code: &str) -> Arc<Mutex<()>> {
        self.inner
            .locks
            .entry(code.to_string())
            .or_default()
            .clone()
    }

    async fn read_session(&self, code: &str) -> Result<Option<JourneySession>, AppError> {
        let path = self.session_dir(code).join("session.json");
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio_fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn write_session(&self, session: &JourneySession) -> Result<(), AppError> {
        let path = self.session_dir(&session.code).join("session.json");
        let json = serde_json::to_string_pretty(session)?;
        tokio_fs::write(path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for FlatFileStore {
    async fn insert_session(&self, session: &JourneySession) -> Result<bool, AppError> {
        let lock = self.write_lock(&session.code);
        let _guard = lock.lock().await;

        let dir = self.session_dir(&session.code);
        if dir.join("session.json").exists() {
            return Ok(false);
        }
        tokio_fs::create_dir_all(&dir).await?;
        self.write_session(session).await?;
        self.inner.index.insert(session.id, session.code.clone());
        Ok(true)
    }

    async fn session_by_code(&self, code: &str) -> Result<Option<JourneySession>, AppError> {
        self.read_session(code).await
    }

    async fn session_by_id(&self, id: Uuid) -> Result<Option<JourneySession>, AppError> {
        let code = match self.inner.index.get(&id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };
        self.read_session(&code).await
    }

    async fn add_member(
        &self,
        code: &str,
        user: &UserIdentity,
    ) -> Result<Option<JourneySession>, AppError> {
        let lock = self.write_lock(code);
        let _guard = lock.lock().await;

        let Some(mut session) = self.read_session(code).await? else {
            return Ok(None);
        };

        if session.leader.id != user.id && !session.members.iter().any(|m| m.id == user.id) {
            session.members.push(user.clone());
            session.updated_at = Utc::now();
            self.write_session(&session).await?;
        }
        Ok(Some(session))
    }

    async fn set_destination(
        &self,
        id: Uuid,
        destination: GeoPoint,
    ) -> Result<Option<JourneySession>, AppError> {
        let code = match self.inner.index.get(&id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(None),
        };

        let lock = self.write_lock(&code);
        let _guard = lock.lock().await;

        let Some(mut session) = self.read_session(&code).await? else {
            return Ok(None);
        };
        session.destination = Some(destination);
        session.updated_at = Utc::now();
        self.write_session(&session).await?;
        Ok(Some(session))
    }

    /// Append a JSON line to `locations.log`.
    async fn append_location(
        &self,
        code: &str,
        record: &LocationRecord,
    ) -> Result<(), AppError> {
        let path = self.session_dir(code).join("locations.log");
        let json = serde_json::to_string(record)?;

        let mut file = tokio_fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        Ok(())
    }

    async fn read_locations(&self, code: &str) -> Result<Vec<LocationRecord>, AppError> {
        let path = self.session_dir(code).join("locations.log");
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = tokio_fs::read_to_string(&path).await?;
        let records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<Vec<LocationRecord>, _>>()?;

        Ok(records)
    }
}
