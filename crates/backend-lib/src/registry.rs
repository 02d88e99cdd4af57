// ============================
// crates/backend-lib/src/registry.rs
// ============================
//! Session registry: creation, join-by-code, leader-gated destination
//! mutation. Destination changes are NOT broadcast from here; the caller
//! propagates them over the room messaging channel.
use crate::error::AppError;
use crate::store::Store;
use crate::validation;
use chrono::Utc;
use convoy_common::{GeoPoint, JourneySession, JourneyStatus, UserIdentity};
use metrics::counter;
use rand::Rng;
use uuid::Uuid;

const CODE_LENGTH: usize = 6;
/// Unambiguous alphabet: no 0/O, 1/I
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_CODE_ATTEMPTS: usize = 8;

/// Generate a short shareable journey code
fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub struct SessionRegistry<S> {
    store: S,
}

impl<S: Store> SessionRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create a new journey session with a freshly generated unique code.
    /// A code collision is retried, never accepted.
    pub async fn create(
        &self,
        leader: UserIdentity,
        destination: GeoPoint,
    ) -> Result<JourneySession, AppError> {
        validation::validate_destination(&destination)?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let now = Utc::now();
            let session = JourneySession {
                id: Uuid::new_v4(),
                code: generate_code(),
                leader: leader.clone(),
                members: Vec::new(),
                destination: Some(destination),
                status: JourneyStatus::Active,
                created_at: now,
                updated_at: now,
            };

            if self.store.insert_session(&session).await? {
                counter!(crate::metric_keys::JOURNEY_CREATED).increment(1);
                tracing::info!(code = %session.code, leader = %session.leader.username, "journey created");
                return Ok(session);
            }
            tracing::warn!(code = %session.code, "journey code collision, retrying");
        }

        Err(AppError::Internal(
            "could not allocate a unique journey code".to_string(),
        ))
    }

    /// Join a journey by code. Repeated joins by the same identity are
    /// no-ops on the member set, not errors.
    pub async fn join_by_code(
        &self,
        code: &str,
        user: UserIdentity,
    ) -> Result<JourneySession, AppError> {
        let code = validation::normalize_code(code)?;
        let session = self
            .store
            .add_member(&code, &user)
            .await?
            .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))?;
        counter!(crate::metric_keys::JOURNEY_JOINED).increment(1);
        Ok(session)
    }

    /// Look up a session without mutating membership (room joins).
    pub async fn find_by_code(&self, code: &str) -> Result<JourneySession, AppError> {
        let code = validation::normalize_code(code)?;
        self.store
            .session_by_code(&code)
            .await?
            .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))
    }

    /// Replace the destination. Leader only.
    pub async fn update_destination(
        &self,
        id: Uuid,
        requester: &UserIdentity,
        destination: GeoPoint,
    ) -> Result<JourneySession, AppError> {
        validation::validate_destination(&destination)?;

        let session = self
            .store
            .session_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))?;

        if session.leader.id != requester.id {
            return Err(AppError::Forbidden(
                "Only group leaders can update destination".to_string(),
            ));
        }

        self.store
            .set_destination(id, destination)
            .await?
            .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FlatFileStore;
    use async_trait::async_trait;
    use convoy_common::{LocationRecord, Role};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn user(name: &str, role: Role) -> UserIdentity {
        UserIdentity {
            id: Uuid::new_v4(),
            username: name.to_string(),
            role,
        }
    }

    fn setup() -> (SessionRegistry<FlatFileStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(temp_dir.path()).unwrap();
        (SessionRegistry::new(store), temp_dir)
    }

    #[test]
    fn test_generated_codes_use_alphabet() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_destination() {
        let (registry, _temp_dir) = setup();
        let result = registry
            .create(
                user("asha", Role::GroupLeader),
                GeoPoint::new(f64::NAN, 19.0760),
            )
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_join_idempotent() {
        let (registry, _temp_dir) = setup();
        let journey = registry
            .create(
                user("asha", Role::GroupLeader),
                GeoPoint::new(72.8777, 19.0760),
            )
            .await
            .unwrap();

        let member = user("ben", Role::Member);
        let first = registry
            .join_by_code(&journey.code, member.clone())
            .await
            .unwrap();
        let second = registry
            .join_by_code(&journey.code, member)
            .await
            .unwrap();
        assert_eq!(first.members.len(), 1);
        assert_eq!(second.members.len(), 1);
    }

    #[tokio::test]
    async fn test_join_unknown_code() {
        let (registry, _temp_dir) = setup();
        let result = registry
            .join_by_code("ZZZZZZ", user("ben", Role::Member))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_destination_requires_leader() {
        let (registry, _temp_dir) = setup();
        let journey = registry
            .create(
                user("asha", Role::GroupLeader),
                GeoPoint::new(72.8777, 19.0760),
            )
            .await
            .unwrap();

        let outsider = user("ben", Role::Member);
        let result = registry
            .update_destination(journey.id, &outsider, GeoPoint::new(77.5946, 12.9716))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        // stored destination unchanged
        let stored = registry.find_by_code(&journey.code).await.unwrap();
        assert_eq!(stored.destination, Some(GeoPoint::new(72.8777, 19.0760)));
    }

    #[tokio::test]
    async fn test_update_destination_by_leader() {
        let (registry, _temp_dir) = setup();
        let leader = user("asha", Role::GroupLeader);
        let journey = registry
            .create(leader.clone(), GeoPoint::new(72.8777, 19.0760))
            .await
            .unwrap();

        let updated = registry
            .update_destination(journey.id, &leader, GeoPoint::new(77.5946, 12.9716))
            .await
            .unwrap();
        assert_eq!(updated.destination, Some(GeoPoint::new(77.5946, 12.9716)));
    }

    #[tokio::test]
    async fn test_update_destination_unknown_id() {
        let (registry, _temp_dir) = setup();
        let result = registry
            .update_destination(
                Uuid::new_v4(),
                &user("asha", Role::GroupLeader),
                GeoPoint::new(77.5946, 12.9716),
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    /// Store double that reports a code collision for the first N inserts
    #[derive(Clone)]
    struct CollidingStore {
        inner: FlatFileStore,
        remaining_collisions: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Store for CollidingStore {
        async fn insert_session(&self, session: &JourneySession) -> Result<bool, AppError> {
            if self
                .remaining_collisions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Ok(false);
            }
            self.inner.insert_session(session).await
        }

        async fn session_by_code(
            &self,
            code: &str,
        ) -> Result<Option<JourneySession>, AppError> {
            self.inner.session_by_code(code).await
        }

        async fn session_by_id(&self, id: Uuid) -> Result<Option<JourneySession>, AppError> {
            self.inner.session_by_id(id).await
        }

        async fn add_member(
            &self,
            code: &str,
            user: &UserIdentity,
        ) -> Result<Option<JourneySession>, AppError> {
            self.inner.add_member(code, user).await
        }

        async fn set_destination(
            &self,
            id: Uuid,
            destination: GeoPoint,
        ) -> Result<Option<JourneySession>, AppError> {
            self.inner.set_destination(id, destination).await
        }

        async fn append_location(
            &self,
            code: &str,
            record: &LocationRecord,
        ) -> Result<(), AppError> {
            self.inner.append_location(code, record).await
        }

        async fn read_locations(&self, code: &str) -> Result<Vec<LocationRecord>, AppError> {
            self.inner.read_locations(code).await
        }
    }

    #[tokio::test]
    async fn test_code_collision_is_retried() {
        let temp_dir = TempDir::new().unwrap();
        let store = CollidingStore {
            inner: FlatFileStore::new(temp_dir.path()).unwrap(),
            remaining_collisions: Arc::new(AtomicUsize::new(2)),
        };
        let registry = SessionRegistry::new(store);

        let journey = registry
            .create(
                user("asha", Role::GroupLeader),
                GeoPoint::new(72.8777, 19.0760),
            )
            .await
            .unwrap();
        assert_eq!(journey.code.len(), CODE_LENGTH);
    }

    #[tokio::test]
    async fn test_exhausted_code_attempts_fail() {
        let temp_dir = TempDir::new().unwrap();
        let store = CollidingStore {
            inner: FlatFileStore::new(temp_dir.path()).unwrap(),
            remaining_collisions: Arc::new(AtomicUsize::new(usize::MAX)),
        };
        let registry = SessionRegistry::new(store);

        let result = registry
            .create(
                user("asha", Role::GroupLeader),
                GeoPoint::new(72.8777, 19.0760),
            )
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
