use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orgaccess_application::{AccessCache, CachedAccess};
use orgaccess_core::{AppResult, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct AccessCacheSlot {
    generation: u64,
    access: Option<CachedAccess>,
}

/// In-memory cache adapter for resolved user access.
///
/// Slots outlive their entries so the invalidation generation never resets.
#[derive(Default)]
pub struct InMemoryAccessCache {
    entries: RwLock<HashMap<UserId, AccessCacheSlot>>,
}

impl InMemoryAccessCache {
    /// Creates an empty in-memory access cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessCache for InMemoryAccessCache {
    async fn get_access(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<CachedAccess>> {
        {
            let entries = self.entries.read().await;
            match entries.get(user_id).and_then(|slot| slot.access.as_ref()) {
                Some(access) if access.is_valid_at(now) => return Ok(Some(access.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if let Some(slot) = entries.get_mut(user_id)
            && slot
                .access
                .as_ref()
                .is_some_and(|access| access.expires_at <= now)
        {
            slot.access = None;
        }

        Ok(None)
    }

    async fn generation(&self, user_id: &UserId) -> AppResult<u64> {
        Ok(self
            .entries
            .read()
            .await
            .get(user_id)
            .map_or(0, |slot| slot.generation))
    }

    async fn set_access(
        &self,
        user_id: &UserId,
        access: CachedAccess,
        generation: u64,
    ) -> AppResult<bool> {
        let mut entries = self.entries.write().await;
        let current_generation = entries.get(user_id).map_or(0, |slot| slot.generation);
        if current_generation != generation {
            return Ok(false);
        }
        if access.expires_at <= access.computed_at {
            return Ok(true);
        }

        entries.entry(user_id.clone()).or_default().access = Some(access);

        Ok(true)
    }

    async fn invalidate_user(&self, user_id: &UserId) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        let slot = entries.entry(user_id.clone()).or_default();
        slot.generation = slot.generation.wrapping_add(1);
        slot.access = None;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use orgaccess_application::{AccessCache, CachedAccess};
    use orgaccess_core::{OrganizationId, UserId};
    use orgaccess_domain::{AccessGrant, MembershipRole};

    use super::InMemoryAccessCache;

    fn computed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, 14, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!())
    }

    fn user() -> UserId {
        UserId::new("alice").unwrap_or_else(|_| unreachable!())
    }

    fn cached(ttl_seconds: i64) -> CachedAccess {
        let organization_id = OrganizationId::new("north").unwrap_or_else(|_| unreachable!());
        CachedAccess {
            global_admin: false,
            grants: vec![AccessGrant::from_membership(
                organization_id.clone(),
                MembershipRole::Member,
                organization_id,
            )],
            computed_at: computed_at(),
            expires_at: computed_at() + Duration::seconds(ttl_seconds),
        }
    }

    #[tokio::test]
    async fn returns_entry_until_expiry() {
        let cache = InMemoryAccessCache::new();
        assert!(cache.set_access(&user(), cached(5), 0).await.is_ok());

        let hit = cache
            .get_access(&user(), computed_at() + Duration::seconds(4))
            .await;
        assert_eq!(
            hit.ok().flatten().map(|access| access.grants.len()),
            Some(1)
        );

        let miss = cache
            .get_access(&user(), computed_at() + Duration::seconds(5))
            .await;
        assert!(matches!(miss, Ok(None)));
        assert!(
            cache
                .entries
                .read()
                .await
                .get(&user())
                .is_some_and(|slot| slot.access.is_none())
        );
    }

    #[tokio::test]
    async fn rejects_lookups_before_computation_time() {
        let cache = InMemoryAccessCache::new();
        assert!(cache.set_access(&user(), cached(30), 0).await.is_ok());

        let earlier = cache
            .get_access(&user(), computed_at() - Duration::seconds(1))
            .await;
        assert!(matches!(earlier, Ok(None)));
        assert_eq!(cache.entries.read().await.len(), 1);
    }

    #[tokio::test]
    async fn skips_entries_that_are_already_expired() {
        let cache = InMemoryAccessCache::new();
        assert!(matches!(cache.set_access(&user(), cached(0), 0).await, Ok(true)));
        assert!(cache.entries.read().await.is_empty());
    }

    #[tokio::test]
    async fn invalidate_removes_only_that_user() {
        let cache = InMemoryAccessCache::new();
        let other = UserId::new("bob").unwrap_or_else(|_| unreachable!());
        assert!(cache.set_access(&user(), cached(30), 0).await.is_ok());
        assert!(cache.set_access(&other, cached(30), 0).await.is_ok());

        assert!(cache.invalidate_user(&user()).await.is_ok());

        assert!(matches!(cache.get_access(&user(), computed_at()).await, Ok(None)));
        assert!(matches!(
            cache.get_access(&other, computed_at()).await,
            Ok(Some(_))
        ));
    }

    #[tokio::test]
    async fn fill_computed_before_invalidation_is_discarded() {
        let cache = InMemoryAccessCache::new();
        let generation = cache.generation(&user()).await.unwrap_or_default();

        assert!(cache.invalidate_user(&user()).await.is_ok());
        let stored = cache.set_access(&user(), cached(30), generation).await;

        assert!(matches!(stored, Ok(false)));
        assert!(matches!(cache.get_access(&user(), computed_at()).await, Ok(None)));
        assert_eq!(cache.generation(&user()).await.unwrap_or_default(), 1);
    }

    #[tokio::test]
    async fn generation_survives_entry_expiry() {
        let cache = InMemoryAccessCache::new();
        assert!(cache.invalidate_user(&user()).await.is_ok());
        assert!(matches!(cache.set_access(&user(), cached(5), 1).await, Ok(true)));

        let expired = cache
            .get_access(&user(), computed_at() + Duration::seconds(10))
            .await;
        assert!(matches!(expired, Ok(None)));

        assert_eq!(cache.generation(&user()).await.unwrap_or_default(), 1);
        let stale = cache.set_access(&user(), cached(30), 0).await;
        assert!(matches!(stale, Ok(false)));
    }
}
