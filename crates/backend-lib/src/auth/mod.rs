// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.
//!
//! Credential storage and the signup/login surface live outside this
//! service; this layer only issues opaque bearer tokens for already
//! authenticated identities and resolves presented tokens back to an
//! identity. A connection presenting no token, an unknown token, or an
//! expired token is rejected before any room operation is possible.

mod service;
pub mod session;
pub mod token;

pub use service::AuthService;
pub use session::{AuthSession, SessionManager};
pub use token::generate_secure_token;

use async_trait::async_trait;
use convoy_common::UserIdentity;

/// Default [`AuthService`] backed by the in-memory [`SessionManager`].
pub struct TokenAuth {
    sessions: SessionManager,
}

impl TokenAuth {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl AuthService for TokenAuth {
    async fn issue(&self, user: UserIdentity) -> String {
        self.sessions.issue(user).await
    }

    async fn verify(&self, token: &str) -> Option<UserIdentity> {
        self.sessions.resolve(token).await
    }
}
