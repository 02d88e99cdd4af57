// ============================
// crates/backend-lib/src/auth/session.rs
// ============================
//! Bearer token handling and management.
use super::token::generate_secure_token;
use convoy_common::UserIdentity;
use metrics::{counter, gauge};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::sync::RwLock;

/// Default token TTL (time to live)
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7); // 7 days

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// A resolved bearer token
#[derive(Clone)]
pub struct AuthSession {
    pub user: UserIdentity,
    pub created_at: SystemTime,
    pub expires_at: SystemTime,
}

/// Manager for issued bearer tokens
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, AuthSession>>>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a new session manager and spawn its periodic cleanup task.
    /// Must be called from within a tokio runtime.
    pub fn new(ttl: Duration) -> Self {
        let manager = SessionManager {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        };

        let manager_clone = manager.clone();
        tokio::spawn(async move {
            manager_clone.cleanup_task().await;
        });

        manager
    }

    /// Issue a new bearer token for an authenticated identity.
    pub async fn issue(&self, user: UserIdentity) -> String {
        let token = generate_secure_token();
        let now = SystemTime::now();
        let session = AuthSession {
            user,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(token.clone(), session);

        counter!(crate::metric_keys::TOKEN_ISSUED).increment(1);
        gauge!(crate::metric_keys::TOKEN_ACTIVE).set(sessions.len() as f64);

        token
    }

    /// Resolve a token to its identity if present and unexpired.
    pub async fn resolve(&self, token: &str) -> Option<UserIdentity> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(token)?;
        if SystemTime::now() < session.expires_at {
            Some(session.user.clone())
        } else {
            None
        }
    }

    /// Cleanup task that runs periodically to remove expired tokens
    async fn cleanup_task(&self) {
        loop {
            tokio::time::sleep(CLEANUP_INTERVAL).await;

            let mut sessions = self.sessions.write().await;
            let now = SystemTime::now();
            let before_count = sessions.len();

            sessions.retain(|_, session| now < session.expires_at);

            let removed = before_count - sessions.len();
            if removed > 0 {
                gauge!(crate::metric_keys::TOKEN_ACTIVE).set(sessions.len() as f64);
                tracing::debug!(removed, "expired bearer tokens removed");
            }
        }
    }
}
