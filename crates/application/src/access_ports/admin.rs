use async_trait::async_trait;
use orgaccess_core::{AppResult, UserId};

/// Capability check for the platform-wide administrator override.
#[async_trait]
pub trait GlobalAdminCheck: Send + Sync {
    /// Returns whether the user bypasses organization tree checks.
    async fn is_global_admin(&self, user_id: &UserId) -> AppResult<bool>;
}
