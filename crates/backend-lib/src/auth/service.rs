use async_trait::async_trait;
use convoy_common::UserIdentity;

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Issue a bearer token for an authenticated identity.
    async fn issue(&self, user: UserIdentity) -> String;
    /// Resolve a presented bearer token to its identity, if valid.
    async fn verify(&self, token: &str) -> Option<UserIdentity>;
}
