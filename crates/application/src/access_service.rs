use std::sync::Arc;

use chrono::{DateTime, Utc};
use orgaccess_core::{AppResult, OrganizationId, UserId};
use orgaccess_domain::{
    AccessGrant, AccessResolver, DelegationIndex, MembershipIndex, OrganizationGraph,
};
use tracing::{debug, warn};

use crate::access_ports::{
    AccessCache, CachedAccess, DelegationRepository, GlobalAdminCheck, MembershipRepository,
    OrganizationRepository,
};

mod guards;
mod resolution;

/// Application service answering "which organizations can this user reach, and how".
///
/// Each call reads a fresh snapshot, builds the organization graph once and
/// resolves in memory. The optional cache sits in front of the resolver only.
#[derive(Clone)]
pub struct AccessService {
    organization_repository: Arc<dyn OrganizationRepository>,
    membership_repository: Arc<dyn MembershipRepository>,
    delegation_repository: Arc<dyn DelegationRepository>,
    global_admin_check: Arc<dyn GlobalAdminCheck>,
    access_cache: Option<Arc<dyn AccessCache>>,
    access_cache_ttl_seconds: u32,
}

impl AccessService {
    /// Creates an access service without caching.
    #[must_use]
    pub fn new(
        organization_repository: Arc<dyn OrganizationRepository>,
        membership_repository: Arc<dyn MembershipRepository>,
        delegation_repository: Arc<dyn DelegationRepository>,
        global_admin_check: Arc<dyn GlobalAdminCheck>,
    ) -> Self {
        Self {
            organization_repository,
            membership_repository,
            delegation_repository,
            global_admin_check,
            access_cache: None,
            access_cache_ttl_seconds: 0,
        }
    }

    /// Adds optional read-through caching keyed by user. A zero ttl disables it.
    #[must_use]
    pub fn with_access_cache(mut self, access_cache: Arc<dyn AccessCache>, ttl_seconds: u32) -> Self {
        self.access_cache = Some(access_cache);
        self.access_cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Drops cached resolution results for a user.
    ///
    /// Must be awaited by every membership or delegation write for that user
    /// before the write is acknowledged.
    pub async fn invalidate_user(&self, user_id: &UserId) -> AppResult<()> {
        if let Some(cache) = &self.access_cache {
            cache.invalidate_user(user_id).await?;
            debug!(user_id = %user_id, "access cache invalidated");
        }

        Ok(())
    }

    fn cache(&self) -> Option<&Arc<dyn AccessCache>> {
        self.access_cache
            .as_ref()
            .filter(|_| self.access_cache_ttl_seconds > 0)
    }

    async fn load_snapshot(&self, user_id: &UserId, now: DateTime<Utc>) -> AppResult<AccessSnapshot> {
        let (organizations, memberships, delegations, global_admin) = tokio::try_join!(
            self.organization_repository.list_organizations(),
            self.membership_repository.list_memberships_for_user(user_id),
            self.delegation_repository.list_delegations_for_user(user_id),
            self.global_admin_check.is_global_admin(user_id),
        )?;

        let snapshot = AccessSnapshot {
            graph: OrganizationGraph::build(organizations),
            memberships: MembershipIndex::build(user_id, memberships),
            delegations: DelegationIndex::build(user_id, delegations, now),
            global_admin,
        };
        snapshot.report_anomalies();

        Ok(snapshot)
    }

    async fn cached_access(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> AppResult<Option<CachedAccess>> {
        let Some(cache) = self.cache() else {
            return Ok(None);
        };

        if let Some(access) = cache.get_access(user_id, now).await?
            && access.is_valid_at(now)
        {
            return Ok(Some(access));
        }

        let generation = cache.generation(user_id).await?;
        let snapshot = self.load_snapshot(user_id, now).await?;
        let access = CachedAccess {
            global_admin: snapshot.global_admin,
            grants: snapshot.resolver().list_accessible_organizations(),
            computed_at: now,
            expires_at: snapshot.valid_until(now, self.access_cache_ttl_seconds),
        };
        if !cache
            .set_access(user_id, access.clone(), generation)
            .await?
        {
            debug!(
                user_id = %user_id,
                generation,
                "user invalidated during resolution, result not cached"
            );
        }

        Ok(Some(access))
    }
}

/// Inputs of one resolution request.
struct AccessSnapshot {
    graph: OrganizationGraph,
    memberships: MembershipIndex,
    delegations: DelegationIndex,
    global_admin: bool,
}

impl AccessSnapshot {
    fn resolver(&self) -> AccessResolver<'_> {
        AccessResolver::new(&self.graph, &self.memberships, &self.delegations)
            .with_global_admin(self.global_admin)
    }

    /// Results stay exact until the ttl elapses or the next live delegation expires.
    fn valid_until(&self, now: DateTime<Utc>, ttl_seconds: u32) -> DateTime<Utc> {
        let ttl_expiry = now + chrono::Duration::seconds(i64::from(ttl_seconds));
        self.delegations
            .next_expiry()
            .map_or(ttl_expiry, |next_expiry| next_expiry.min(ttl_expiry))
    }

    fn report_anomalies(&self) {
        let user_id = self.memberships.user_id();

        for anomaly in self.graph.anomalies() {
            warn!(user_id = %user_id, anomaly = %anomaly, "organization graph integrity anomaly");
        }
        for anomaly in self
            .memberships
            .anomalies()
            .iter()
            .chain(self.delegations.anomalies())
        {
            warn!(user_id = %user_id, anomaly = %anomaly, "grant index consistency anomaly");
        }
    }
}

fn lookup_cached_grant(access: &CachedAccess, organization_id: &OrganizationId) -> Option<AccessGrant> {
    if access.global_admin {
        return Some(AccessGrant::global_admin(organization_id.clone()));
    }

    access
        .grants
        .iter()
        .find(|grant| &grant.organization_id == organization_id)
        .cloned()
}
