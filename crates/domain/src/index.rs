use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use orgaccess_core::{GrantId, OrganizationId, UserId};

use crate::{DelegationGrant, MembershipGrant, MembershipRole, MembershipStatus};

/// Consistency problem found while indexing grant rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexAnomaly {
    /// Two active memberships exist at one organization; the higher grant id was kept.
    DuplicateMembership {
        /// Organization holding both memberships.
        organization_id: OrganizationId,
        /// Grant that now determines the role.
        kept_grant_id: GrantId,
        /// Grant that was ignored.
        discarded_grant_id: GrantId,
    },
    /// A row for another user was handed to the index and skipped.
    ForeignGrant {
        /// Skipped grant.
        grant_id: GrantId,
    },
}

impl Display for IndexAnomaly {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateMembership {
                organization_id,
                kept_grant_id,
                discarded_grant_id,
            } => write!(
                formatter,
                "duplicate active membership at '{organization_id}': kept '{kept_grant_id}', discarded '{discarded_grant_id}'"
            ),
            Self::ForeignGrant { grant_id } => {
                write!(formatter, "grant '{grant_id}' belongs to another user")
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MembershipEntry {
    grant_id: GrantId,
    role: MembershipRole,
}

/// Directly assigned roles of one user, keyed by organization.
#[derive(Debug, Clone)]
pub struct MembershipIndex {
    user_id: UserId,
    entries: HashMap<OrganizationId, MembershipEntry>,
    anomalies: Vec<IndexAnomaly>,
}

impl MembershipIndex {
    /// Indexes the active membership rows of `user_id`.
    ///
    /// Rows are applied in grant id order, so when two active rows share an
    /// organization the one with the higher id wins.
    #[must_use]
    pub fn build(user_id: &UserId, grants: impl IntoIterator<Item = MembershipGrant>) -> Self {
        let mut anomalies = Vec::new();
        let mut active: Vec<MembershipGrant> = Vec::new();

        for grant in grants {
            if &grant.user_id != user_id {
                anomalies.push(IndexAnomaly::ForeignGrant { grant_id: grant.id });
                continue;
            }
            if grant.status == MembershipStatus::Active {
                active.push(grant);
            }
        }

        active.sort_by_key(|grant| grant.id);

        let mut entries: HashMap<OrganizationId, MembershipEntry> = HashMap::new();
        for grant in active {
            let entry = MembershipEntry {
                grant_id: grant.id,
                role: grant.role,
            };
            if let Some(previous) = entries.insert(grant.organization_id.clone(), entry) {
                anomalies.push(IndexAnomaly::DuplicateMembership {
                    organization_id: grant.organization_id,
                    kept_grant_id: grant.id,
                    discarded_grant_id: previous.grant_id,
                });
            }
        }

        Self {
            user_id: user_id.clone(),
            entries,
            anomalies,
        }
    }

    /// Returns the indexed user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the role assigned directly at the organization.
    #[must_use]
    pub fn role_at(&self, organization_id: &OrganizationId) -> Option<MembershipRole> {
        self.entries.get(organization_id).map(|entry| entry.role)
    }

    /// Iterates organizations holding a membership with their role.
    pub fn iter(&self) -> impl Iterator<Item = (&OrganizationId, MembershipRole)> {
        self.entries
            .iter()
            .map(|(organization_id, entry)| (organization_id, entry.role))
    }

    /// Returns the number of organizations with a direct membership.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the user holds no active membership.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns consistency problems found while indexing.
    #[must_use]
    pub fn anomalies(&self) -> &[IndexAnomaly] {
        &self.anomalies
    }
}

/// Live delegation scopes of one user, keyed by organization.
#[derive(Debug, Clone)]
pub struct DelegationIndex {
    user_id: UserId,
    evaluated_at: DateTime<Utc>,
    scopes: HashMap<OrganizationId, BTreeSet<String>>,
    next_expiry: Option<DateTime<Utc>>,
    anomalies: Vec<IndexAnomaly>,
}

impl DelegationIndex {
    /// Indexes the delegations of `user_id` that are live at `now`.
    #[must_use]
    pub fn build(
        user_id: &UserId,
        grants: impl IntoIterator<Item = DelegationGrant>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut anomalies = Vec::new();
        let mut scopes: HashMap<OrganizationId, BTreeSet<String>> = HashMap::new();
        let mut next_expiry: Option<DateTime<Utc>> = None;

        for grant in grants {
            if &grant.delegate_user_id != user_id {
                anomalies.push(IndexAnomaly::ForeignGrant { grant_id: grant.id });
                continue;
            }
            if !grant.is_live_at(now) {
                continue;
            }

            if let Some(expires_at) = grant.expires_at {
                next_expiry = Some(next_expiry.map_or(expires_at, |current| current.min(expires_at)));
            }

            scopes
                .entry(grant.organization_id)
                .or_default()
                .insert(String::from(grant.scope));
        }

        Self {
            user_id: user_id.clone(),
            evaluated_at: now,
            scopes,
            next_expiry,
            anomalies,
        }
    }

    /// Returns the indexed user.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the evaluation time used for liveness.
    #[must_use]
    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.evaluated_at
    }

    /// Returns live scopes recorded directly at the organization.
    #[must_use]
    pub fn scopes_at(&self, organization_id: &OrganizationId) -> Option<&BTreeSet<String>> {
        self.scopes
            .get(organization_id)
            .filter(|scopes| !scopes.is_empty())
    }

    /// Iterates organizations holding at least one live delegation.
    pub fn iter(&self) -> impl Iterator<Item = (&OrganizationId, &BTreeSet<String>)> {
        self.scopes.iter()
    }

    /// Returns the earliest expiry among live delegations.
    ///
    /// Results derived from this index stay valid until that instant.
    #[must_use]
    pub fn next_expiry(&self) -> Option<DateTime<Utc>> {
        self.next_expiry
    }

    /// Returns whether the user holds no live delegation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Returns consistency problems found while indexing.
    #[must_use]
    pub fn anomalies(&self) -> &[IndexAnomaly] {
        &self.anomalies
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use orgaccess_core::{GrantId, NonEmptyString, OrganizationId, UserId};
    use uuid::Uuid;

    use super::{DelegationIndex, IndexAnomaly, MembershipIndex};
    use crate::{DelegationGrant, MembershipGrant, MembershipRole, MembershipStatus};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(|| unreachable!())
    }

    fn org(value: &str) -> OrganizationId {
        OrganizationId::new(value).unwrap_or_else(|_| unreachable!())
    }

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap_or_else(|_| unreachable!())
    }

    fn membership(id: u128, organization: &str, role: MembershipRole) -> MembershipGrant {
        MembershipGrant {
            id: GrantId::from_uuid(Uuid::from_u128(id)),
            organization_id: org(organization),
            user_id: user("alice"),
            role,
            status: MembershipStatus::Active,
        }
    }

    fn delegation(organization: &str, scope: &str) -> DelegationGrant {
        DelegationGrant {
            id: GrantId::new(),
            organization_id: org(organization),
            delegate_user_id: user("alice"),
            scope: NonEmptyString::new(scope).unwrap_or_else(|_| unreachable!()),
            revoked_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn membership_index_ignores_inactive_rows() {
        let mut pending = membership(1, "org-a", MembershipRole::Owner);
        pending.status = MembershipStatus::Pending;
        let mut removed = membership(2, "org-b", MembershipRole::Owner);
        removed.status = MembershipStatus::Removed;

        let index = MembershipIndex::build(
            &user("alice"),
            [pending, removed, membership(3, "org-c", MembershipRole::Viewer)],
        );

        assert_eq!(index.len(), 1);
        assert_eq!(index.role_at(&org("org-c")), Some(MembershipRole::Viewer));
        assert_eq!(index.role_at(&org("org-a")), None);
        assert!(index.anomalies().is_empty());
    }

    #[test]
    fn duplicate_membership_keeps_highest_grant_id_regardless_of_input_order() {
        let first = membership(10, "org-a", MembershipRole::Viewer);
        let second = membership(20, "org-a", MembershipRole::Admin);

        let forward = MembershipIndex::build(&user("alice"), [first.clone(), second.clone()]);
        let reversed = MembershipIndex::build(&user("alice"), [second, first]);

        assert_eq!(forward.role_at(&org("org-a")), Some(MembershipRole::Admin));
        assert_eq!(reversed.role_at(&org("org-a")), Some(MembershipRole::Admin));
        assert_eq!(
            forward.anomalies(),
            [IndexAnomaly::DuplicateMembership {
                organization_id: org("org-a"),
                kept_grant_id: GrantId::from_uuid(Uuid::from_u128(20)),
                discarded_grant_id: GrantId::from_uuid(Uuid::from_u128(10)),
            }]
        );
    }

    #[test]
    fn rows_for_other_users_are_skipped() {
        let mut foreign = membership(1, "org-a", MembershipRole::Owner);
        foreign.user_id = user("mallory");

        let index = MembershipIndex::build(&user("alice"), [foreign]);
        assert!(index.is_empty());
        assert_eq!(index.anomalies().len(), 1);
    }

    #[test]
    fn delegation_index_keeps_only_live_scopes() {
        let mut expired = delegation("org-a", "finance");
        expired.expires_at = Some(now() - Duration::minutes(1));
        let mut revoked = delegation("org-a", "audit");
        revoked.revoked_at = Some(now() - Duration::days(2));
        let live = delegation("org-a", "reporting");

        let index = DelegationIndex::build(&user("alice"), [expired, revoked, live], now());

        let scopes: Vec<&str> = index
            .scopes_at(&org("org-a"))
            .map(|scopes| scopes.iter().map(String::as_str).collect())
            .unwrap_or_default();
        assert_eq!(scopes, ["reporting"]);
    }

    #[test]
    fn delegation_index_merges_scopes_per_organization() {
        let index = DelegationIndex::build(
            &user("alice"),
            [
                delegation("org-a", "reporting"),
                delegation("org-a", "exports"),
                delegation("org-b", "reporting"),
            ],
            now(),
        );

        assert_eq!(index.scopes_at(&org("org-a")).map(|scopes| scopes.len()), Some(2));
        assert_eq!(index.scopes_at(&org("org-b")).map(|scopes| scopes.len()), Some(1));
        assert!(index.scopes_at(&org("org-c")).is_none());
    }

    #[test]
    fn next_expiry_is_earliest_live_expiry() {
        let mut soon = delegation("org-a", "reporting");
        soon.expires_at = Some(now() + Duration::minutes(5));
        let mut later = delegation("org-b", "reporting");
        later.expires_at = Some(now() + Duration::hours(5));
        let mut already_expired = delegation("org-c", "reporting");
        already_expired.expires_at = Some(now() - Duration::hours(1));

        let index = DelegationIndex::build(
            &user("alice"),
            [later, already_expired, soon, delegation("org-d", "reporting")],
            now(),
        );

        assert_eq!(index.next_expiry(), Some(now() + Duration::minutes(5)));
        assert_eq!(index.evaluated_at(), now());
    }
}
