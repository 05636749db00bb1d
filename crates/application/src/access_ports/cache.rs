use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgaccess_core::{AppResult, UserId};
use orgaccess_domain::AccessGrant;

/// Resolution result cached for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAccess {
    /// Outcome of the global admin capability check.
    pub global_admin: bool,
    /// Full listing of accessible organizations.
    pub grants: Vec<AccessGrant>,
    /// Evaluation time the listing was computed for.
    pub computed_at: DateTime<Utc>,
    /// First instant the listing may be stale.
    pub expires_at: DateTime<Utc>,
}

impl CachedAccess {
    /// Returns whether the entry answers queries evaluated at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.computed_at <= now && now < self.expires_at
    }
}

/// Optional read-through cache port for resolution results, keyed by user.
///
/// Every user carries an invalidation generation. A fill computed after
/// reading generation `n` is only stored while the generation is still `n`,
/// so a request racing with a grant write never restores pre-write access.
#[async_trait]
pub trait AccessCache: Send + Sync {
    /// Returns the cached entry when it is valid at `now`.
    async fn get_access(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<CachedAccess>>;

    /// Returns the current invalidation generation of a user. Unknown users start at zero.
    async fn generation(&self, user_id: &UserId) -> AppResult<u64>;

    /// Stores an entry computed under `generation`.
    ///
    /// Returns `false` without writing when the user was invalidated since.
    async fn set_access(
        &self,
        user_id: &UserId,
        access: CachedAccess,
        generation: u64,
    ) -> AppResult<bool>;

    /// Drops the entry of a user and advances its generation. Called synchronously after grant writes.
    async fn invalidate_user(&self, user_id: &UserId) -> AppResult<()>;
}
